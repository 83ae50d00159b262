use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::{error, info};
use wasm_bindgen::prelude::*;
use web_sys::{
	Blob, BlobPropertyBag, CanvasRenderingContext2d, HtmlAnchorElement, HtmlCanvasElement,
	KeyboardEvent, MouseEvent, Url, WheelEvent, Window,
};

use super::details::NodeDetails;
use super::render;
use crate::chronology::{Graph, Node, NodeId, NodeKind};
use crate::view::export::{PNG_FILE_NAME, SVG_FILE_NAME};
use crate::view::{
	KeyAction, Progress, Transform, ViewConfig, ViewController, ViewEvent, ViewMode, ViewStats,
	VisibleStatus, empty_message, export_svg,
};

const FRAME_DT: f64 = 0.016;

type SharedView = Rc<RefCell<Option<ViewController>>>;

/// Reactive mirror of the controller state the markup depends on.
#[derive(Clone, Copy)]
struct UiSignals {
	status: RwSignal<VisibleStatus>,
	stats: RwSignal<ViewStats>,
	selected: RwSignal<Option<Node>>,
	scale: RwSignal<f64>,
	mode: RwSignal<ViewMode>,
	stabilizing: RwSignal<bool>,
}

impl UiSignals {
	fn new() -> Self {
		Self {
			status: RwSignal::new(VisibleStatus::NoData),
			stats: RwSignal::new(ViewStats::default()),
			selected: RwSignal::new(None),
			scale: RwSignal::new(1.0),
			mode: RwSignal::new(ViewMode::Network),
			stabilizing: RwSignal::new(false),
		}
	}

	fn sync(&self, view: &ViewController) {
		set_if_changed(self.status, view.status());
		set_if_changed(self.stats, view.stats());
		set_if_changed(self.scale, view.transform().k);
		set_if_changed(self.mode, view.mode());
		set_if_changed(self.stabilizing, view.is_stabilizing());
		if self.selected.with_untracked(|s| s.as_ref().map(|n| n.id)) != view.selected() {
			self.selected.set(view.selected_node().cloned());
		}
	}
}

fn set_if_changed<T: PartialEq + Send + Sync + 'static>(signal: RwSignal<T>, value: T) {
	if signal.with_untracked(|current| *current != value) {
		signal.set(value);
	}
}

/// Runs `f` on the controller, if mounted, then refreshes the UI signals.
fn update_view(view: &SharedView, ui: UiSignals, f: impl FnOnce(&mut ViewController)) {
	if let Some(ref mut v) = *view.borrow_mut() {
		f(v);
		ui.sync(v);
	}
}

fn local_point(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

fn download(href: &str, file_name: &str) {
	let Some(document) = web_sys::window().and_then(|w| w.document()) else {
		return;
	};
	let Ok(link) = document
		.create_element("a")
		.map(|el| el.unchecked_into::<HtmlAnchorElement>())
	else {
		error!("could not create download link");
		return;
	};
	link.set_href(href);
	link.set_download(file_name);
	link.click();
}

fn download_svg(svg: &str) {
	let parts = js_sys::Array::of1(&JsValue::from_str(svg));
	let options = BlobPropertyBag::new();
	options.set_type("image/svg+xml;charset=utf-8");
	let url = Blob::new_with_str_sequence_and_options(&parts, &options)
		.and_then(|blob| Url::create_object_url_with_blob(&blob));
	match url {
		Ok(url) => {
			download(&url, SVG_FILE_NAME);
			let _ = Url::revoke_object_url(&url);
		}
		Err(err) => error!("SVG export failed: {err:?}"),
	}
}

/// Canvas view of an assembled chronology graph with search, type filter,
/// zoom controls, timeline toggle and export.
#[component]
pub fn ChronologyGraph(
	/// Assembled graph; a new value replaces the view's snapshot.
	#[prop(into)]
	graph: Signal<Graph>,
	/// Called whenever the selected node changes.
	#[prop(optional, into)]
	on_select: Option<Callback<Option<NodeId>>>,
	/// Called whenever zoom or pan changes.
	#[prop(optional, into)]
	on_viewport: Option<Callback<Transform>>,
	/// View tunables; defaults when omitted.
	#[prop(optional)]
	config: Option<ViewConfig>,
	/// Size the canvas to the window and follow resizes.
	#[prop(default = false)]
	fullscreen: bool,
	/// Canvas width; defaults to the parent's width.
	#[prop(default = None)]
	width: Option<f64>,
	/// Canvas height; defaults to 700 px.
	#[prop(default = None)]
	height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: SharedView = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let ui = UiSignals::new();
	let search = RwSignal::new(String::new());
	let type_filter = RwSignal::new(String::new());
	let (state_init, animate_init, resize_cb_init) =
		(state.clone(), animate.clone(), resize_cb.clone());

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};
		let window_size = |win: &Window| {
			(
				win.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(800.0),
				win.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(600.0),
			)
		};

		let (w, h) = if fullscreen {
			window_size(&window)
		} else {
			(
				width.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_width() as f64)
						.unwrap_or(800.0)
				}),
				height.unwrap_or(700.0),
			)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let ctx: CanvasRenderingContext2d = match canvas.get_context("2d") {
			Ok(Some(ctx)) => match ctx.dyn_into() {
				Ok(ctx) => ctx,
				Err(_) => return,
			},
			_ => {
				error!("2d canvas context unavailable");
				return;
			}
		};

		let mut controller = ViewController::new(
			Rc::new(graph.get_untracked()),
			config.clone().unwrap_or_default(),
			w,
			h,
		);
		controller.subscribe(move |event| match event {
			ViewEvent::SelectionChanged(id) => {
				if let Some(cb) = on_select {
					cb.run(*id);
				}
			}
			ViewEvent::ViewportChanged(t) => {
				if let Some(cb) = on_viewport {
					cb.run(*t);
				}
			}
			ViewEvent::VisibleChanged(status) => info!("visible set: {status:?}"),
		});
		ui.sync(&controller);
		*state_init.borrow_mut() = Some(controller);

		if fullscreen {
			let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let Some(win) = web_sys::window() else {
					return;
				};
				let (nw, nh) = window_size(&win);
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				update_view(&state_resize, ui, |v| v.set_viewport(nw, nh));
			}));
			if let Some(ref cb) = *resize_cb_init.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let (state_anim, animate_inner) = (state_init.clone(), animate_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			if let Some(ref mut v) = *state_anim.borrow_mut() {
				if v.tick(FRAME_DT) == Progress::Finished {
					ui.stabilizing.set(false);
				}
				render::render(v, &ctx);
			}
			if let (Some(win), Some(cb)) = (web_sys::window(), animate_inner.borrow().as_ref()) {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	// A new assembly replaces the snapshot; the first run is covered by
	// the mount effect above.
	let state_graph = state.clone();
	Effect::new(move |prev: Option<()>| {
		let next = graph.get();
		if prev.is_some() {
			update_view(&state_graph, ui, |v| v.set_graph(Rc::new(next)));
		}
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		if let Some((x, y)) = local_point(canvas_ref, &ev) {
			update_view(&state_md, ui, |v| v.pointer_down(x, y));
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		if let Some((x, y)) = local_point(canvas_ref, &ev) {
			if let Some(ref mut v) = *state_mm.borrow_mut() {
				v.pointer_move(x, y);
			}
		}
	};

	let state_mu = state.clone();
	let on_mouseup = move |ev: MouseEvent| {
		if let Some((x, y)) = local_point(canvas_ref, &ev) {
			update_view(&state_mu, ui, |v| v.pointer_up(x, y));
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		update_view(&state_ml, ui, |v| v.pointer_leave());
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		if let Some((x, y)) = local_point(canvas_ref, &ev) {
			update_view(&state_wh, ui, |v| v.wheel(x, y, ev.delta_y()));
		}
	};

	let state_key = state.clone();
	let on_keydown = move |ev: KeyboardEvent| {
		if let Some(action) = KeyAction::from_key(&ev.key()) {
			ev.prevent_default();
			update_view(&state_key, ui, |v| v.key(action));
		}
	};

	let state_search = state.clone();
	let on_search = move |ev: leptos::ev::Event| {
		let query = event_target_value(&ev);
		search.set(query.clone());
		update_view(&state_search, ui, |v| v.set_search(query));
	};

	let state_type = state.clone();
	let on_type = move |ev: leptos::ev::Event| {
		let value = event_target_value(&ev);
		let kind = NodeKind::parse(&value);
		type_filter.set(value);
		update_view(&state_type, ui, |v| v.set_type_filter(kind));
	};

	let (state_zi, state_zo, state_fit, state_stab, state_mode, state_png, state_svg) = (
		state.clone(),
		state.clone(),
		state.clone(),
		state.clone(),
		state.clone(),
		state.clone(),
		state.clone(),
	);
	let state_reset = state.clone();
	// callbacks must be Send + Sync; the arena handle is, the Rc is not
	let state_close = StoredValue::new_local(state.clone());

	let on_reset = move |_: MouseEvent| {
		search.set(String::new());
		type_filter.set(String::new());
		update_view(&state_reset, ui, |v| v.reset());
	};

	let on_export_png = move |_: MouseEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		// the canvas already holds the last rendered frame
		if state_png.borrow().is_none() {
			return;
		}
		match canvas.to_data_url() {
			Ok(url) => download(&url, PNG_FILE_NAME),
			Err(err) => error!("PNG export failed: {err:?}"),
		}
	};

	let on_export_svg = move |_: MouseEvent| {
		if let Some(ref v) = *state_svg.borrow() {
			download_svg(&export_svg(v));
		}
	};

	let on_close = Callback::new(move |_: ()| {
		state_close.with_value(|state| update_view(state, ui, |v| v.select_node(None)));
	});

	view! {
		<div class="chronology-graph">
			<div class="graph-controls">
				<input
					type="text"
					class="graph-search"
					placeholder="Search nodes..."
					prop:value=move || search.get()
					on:input=on_search
				/>
				<select
					class="graph-type-filter"
					prop:value=move || type_filter.get()
					on:change=on_type
				>
					<option value="">"All Types"</option>
					<option value="event">"Events Only"</option>
					<option value="pattern">"Patterns Only"</option>
					<option value="prophecy">"Prophecies Only"</option>
				</select>
				<div class="graph-buttons">
					<button
						title="Zoom In"
						on:click=move |_| update_view(&state_zi, ui, |v| v.zoom_in())
					>
						"+"
					</button>
					<span class="graph-scale">
						{move || format!("{:.0}%", ui.scale.get() * 100.0)}
					</span>
					<button
						title="Zoom Out"
						on:click=move |_| update_view(&state_zo, ui, |v| v.zoom_out())
					>
						"−"
					</button>
					<button
						title="Fit to Screen"
						on:click=move |_| update_view(&state_fit, ui, |v| v.fit_to_content())
					>
						"Fit"
					</button>
					<button title="Reset View" on:click=on_reset>
						"Reset"
					</button>
					<button
						title="Re-run layout"
						disabled=move || ui.mode.get() == ViewMode::Timeline
						on:click=move |_| update_view(&state_stab, ui, |v| v.stabilize())
					>
						{move || if ui.stabilizing.get() { "Stabilizing…" } else { "Stabilize" }}
					</button>
					<button
						title="Switch layout"
						on:click=move |_| {
							update_view(
								&state_mode,
								ui,
								|v| {
									let next = match v.mode() {
										ViewMode::Network => ViewMode::Timeline,
										ViewMode::Timeline => ViewMode::Network,
									};
									v.set_mode(next);
								},
							)
						}
					>
						{move || match ui.mode.get() {
							ViewMode::Network => "Timeline",
							ViewMode::Timeline => "Network",
						}}
					</button>
				</div>
				<div class="graph-stats">
					<span>{move || ui.stats.get().nodes}</span>
					" nodes • "
					<span>{move || ui.stats.get().edges}</span>
					" edges"
				</div>
				<div class="graph-export">
					<button on:click=on_export_png>"Export PNG"</button>
					<button on:click=on_export_svg>"Export SVG"</button>
				</div>
			</div>

			<div class="graph-legend">
				<span class="legend-event">"Events"</span>
				<span class="legend-pattern">"Patterns"</span>
				<span class="legend-prophecy">"Prophecies"</span>
			</div>

			<div class="graph-canvas-container">
				<canvas
					node_ref=canvas_ref
					class="chronology-graph-canvas"
					on:mousedown=on_mousedown
					on:mousemove=on_mousemove
					on:mouseup=on_mouseup
					on:mouseleave=on_mouseleave
					on:wheel=on_wheel
					on:keydown=on_keydown
					tabindex="0"
					style="display: block; cursor: grab;"
				/>
				{move || {
					empty_message(ui.status.get())
						.map(|message| view! { <div class="graph-empty">{message}</div> })
				}}
			</div>

			<NodeDetails node=ui.selected.read_only() on_close=on_close />
		</div>
	}
}
