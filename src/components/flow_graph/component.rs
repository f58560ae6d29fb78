//! Leptos component wrapping the flow graph canvas.
//!
//! The component builds the forest from the row signal, derives the initial
//! visible set, and wires up mouse/wheel handlers for panning, zooming,
//! hovering, and expand/collapse clicks. A `requestAnimationFrame` loop
//! redraws the canvas each frame. Layout requests run through the external
//! engine asynchronously; a rebuild or a later request invalidates whatever
//! is still in flight.

use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::debug;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::layout::{self, LayoutGeneration, LayoutOptions};
use super::render::{self, ViewTransform};
use super::theme::Theme;
use super::tree::Forest;
use super::types::{FlowConfig, FlowRow};
use super::visible::{ClickOutcome, VisibleSet, build_collapse_nodes, node_click};

/// Tracks an in-progress pan, and whether the gesture is still a click.
#[derive(Clone, Debug, Default)]
struct PanState {
	active: bool,
	start_x: f64,
	start_y: f64,
	view_start_x: f64,
	view_start_y: f64,
	/// Peak pointer displacement since mousedown; staying small counts as a click.
	moved: f64,
	/// Node under the pointer at mousedown, toggled on release.
	pressed: Option<String>,
}

/// Everything the handlers and the draw loop share: the live forest, the
/// derived visible set, and view/interaction state. Forest and visible set
/// are only ever replaced together (one rebuild transaction).
struct GraphContext {
	forest: Forest,
	visible: VisibleSet,
	config: FlowConfig,
	theme: Theme,
	view: ViewTransform,
	pan: PanState,
	hover: Option<String>,
	width: f64,
	height: f64,
}

/// Renders an interactive collapsible flow graph on a canvas element.
///
/// Pass rows via the reactive `rows` signal; the forest and all derived
/// visible state are rebuilt together whenever it changes. The component
/// sizes itself to its parent container by default; set `fullscreen = true`
/// to fill the viewport and resize with the window.
#[component]
pub fn FlowGraphCanvas(
	#[prop(into)] rows: Signal<Vec<FlowRow>>,
	#[prop(optional)] config: FlowConfig,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let context: Rc<RefCell<Option<GraphContext>>> = Rc::new(RefCell::new(None));
	// Outlives rebuilds so stale in-flight layout responses stay invalidated.
	let generation: Rc<LayoutGeneration> = Rc::new(LayoutGeneration::default());
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let (context_init, generation_init, animate_init, resize_cb_init) = (
		context.clone(),
		generation.clone(),
		animate.clone(),
		resize_cb.clone(),
	);

	Effect::new(move |_| {
		let rows = rows.get();
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let window: Window = web_sys::window().unwrap();

		let (w, h) = if fullscreen {
			(
				window.inner_width().unwrap().as_f64().unwrap(),
				window.inner_height().unwrap().as_f64().unwrap(),
			)
		} else {
			(
				width.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_width() as f64)
						.unwrap_or(800.0)
				}),
				height.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_height() as f64)
						.unwrap_or(600.0)
				}),
			)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let ctx: CanvasRenderingContext2d = canvas
			.get_context("2d")
			.unwrap()
			.unwrap()
			.dyn_into()
			.unwrap();

		// Rebuild transaction: forest and derived visible state replaced
		// together, never one without the other.
		let mut forest = Forest::build(&rows, &config).filter_zeros();
		let visible = build_collapse_nodes(&mut forest);
		debug!(
			"flow-graph: built forest of {} nodes, {} visible / {} edges",
			forest.len(),
			visible.nodes.len(),
			visible.edges.len()
		);

		*context_init.borrow_mut() = Some(GraphContext {
			forest,
			visible,
			config: config.clone(),
			theme: Theme::default(),
			view: ViewTransform {
				x: 20.0,
				y: 20.0,
				k: 1.0,
			},
			pan: PanState::default(),
			hover: None,
			width: w,
			height: h,
		});

		spawn_layout(&context_init, &generation_init);

		if fullscreen && resize_cb_init.borrow().is_none() {
			let (context_resize, canvas_resize) = (context_init.clone(), canvas.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let win: Window = web_sys::window().unwrap();
				let (nw, nh) = (
					win.inner_width().unwrap().as_f64().unwrap(),
					win.inner_height().unwrap().as_f64().unwrap(),
				);
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				if let Some(ref mut c) = *context_resize.borrow_mut() {
					c.width = nw;
					c.height = nh;
				}
			}));
			if let Some(ref cb) = *resize_cb_init.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		// The draw loop is started once; rebuilds only swap the context.
		if animate_init.borrow().is_none() {
			let (context_anim, animate_inner) = (context_init.clone(), animate_init.clone());
			*animate_init.borrow_mut() = Some(Closure::new(move || {
				if let Some(ref c) = *context_anim.borrow() {
					render::render(
						&c.visible,
						&ctx,
						&c.view,
						&c.theme,
						c.config.node_width,
						c.config.node_height,
						c.width,
						c.height,
						c.hover.as_deref(),
					);
				}
				if let Some(ref cb) = *animate_inner.borrow() {
					let _ = web_sys::window()
						.unwrap()
						.request_animation_frame(cb.as_ref().unchecked_ref());
				}
			}));
			if let Some(ref cb) = *animate_init.borrow() {
				let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}
	});

	let context_md = context.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let rect = canvas.get_bounding_client_rect();
		let (x, y) = (
			ev.client_x() as f64 - rect.left(),
			ev.client_y() as f64 - rect.top(),
		);

		if let Some(ref mut c) = *context_md.borrow_mut() {
			c.pan.active = true;
			c.pan.start_x = x;
			c.pan.start_y = y;
			c.pan.view_start_x = c.view.x;
			c.pan.view_start_y = c.view.y;
			c.pan.moved = 0.0;
			c.pan.pressed = render::node_at_position(
				&c.visible,
				&c.view,
				x,
				y,
				c.config.node_width,
				c.config.node_height,
			);
		}
	};

	let context_mm = context.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let rect = canvas.get_bounding_client_rect();
		let (x, y) = (
			ev.client_x() as f64 - rect.left(),
			ev.client_y() as f64 - rect.top(),
		);

		if let Some(ref mut c) = *context_mm.borrow_mut() {
			if c.pan.active {
				let (dx, dy) = (x - c.pan.start_x, y - c.pan.start_y);
				c.pan.moved = c.pan.moved.max(dx.abs() + dy.abs());
				c.view.x = c.pan.view_start_x + dx;
				c.view.y = c.pan.view_start_y + dy;
			} else {
				c.hover = render::node_at_position(
					&c.visible,
					&c.view,
					x,
					y,
					c.config.node_width,
					c.config.node_height,
				);
			}
		}
	};

	let (context_mu, generation_mu) = (context.clone(), generation.clone());
	let on_mouseup = move |_: MouseEvent| {
		let mut relayout = false;
		if let Some(ref mut c) = *context_mu.borrow_mut() {
			let was_click = c.pan.active && c.pan.moved < 4.0;
			c.pan.active = false;
			let pressed = c.pan.pressed.take();

			if was_click {
				if let Some(id) = pressed {
					match node_click(&mut c.forest, &c.visible, &id) {
						ClickOutcome::NoOp => {
							debug!("flow-graph: click on {id} had nothing to toggle");
						}
						ClickOutcome::Changed(next) => {
							let grew = next.nodes.len() > c.visible.nodes.len()
								|| next.edges.len() > c.visible.edges.len();
							c.visible = next;
							// Only a grown graph needs repositioning, unless
							// the host asked for layout on every toggle.
							relayout = grew || c.config.auto_layout;
						}
					}
				}
			}
		}
		if relayout {
			spawn_layout(&context_mu, &generation_mu);
		}
	};

	let context_ml = context.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut c) = *context_ml.borrow_mut() {
			c.pan.active = false;
			c.pan.pressed = None;
			c.hover = None;
		}
	};

	let context_wh = context.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let rect = canvas.get_bounding_client_rect();
		let (x, y) = (
			ev.client_x() as f64 - rect.left(),
			ev.client_y() as f64 - rect.top(),
		);

		if let Some(ref mut c) = *context_wh.borrow_mut() {
			let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
			let new_k = (c.view.k * factor).clamp(0.1, 10.0);
			let ratio = new_k / c.view.k;
			c.view.x = x - (x - c.view.x) * ratio;
			c.view.y = y - (y - c.view.y) * ratio;
			c.view.k = new_k;
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="flow-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}

/// Snapshots the visible set, begins a new layout generation, and fires the
/// request. The response is applied only if no newer generation has started
/// by the time it arrives.
fn spawn_layout(context: &Rc<RefCell<Option<GraphContext>>>, generation: &Rc<LayoutGeneration>) {
	let (payload, requested) = {
		let borrow = context.borrow();
		let Some(c) = borrow.as_ref() else {
			return;
		};
		if c.visible.nodes.is_empty() {
			return;
		}
		(
			layout::layout_payload(&c.visible, &LayoutOptions::from_config(&c.config)),
			generation.begin(),
		)
	};

	let (context, generation) = (context.clone(), generation.clone());
	layout::request_layout(&payload, move |result| {
		if !generation.is_current(requested) {
			debug!("flow-graph: dropping stale layout response (generation {requested})");
			return;
		}
		if let Some(ref mut c) = *context.borrow_mut() {
			layout::apply_positions(&mut c.visible, &result);
		}
	});
}
