use leptos::prelude::*;
use log::{debug, error};
use serde_json::{Value, json};

use crate::chronology::{
	DecodeError, Graph, NodeId, assemble, decode_events, decode_patterns, decode_prophecies,
};
use crate::components::graph_view::ChronologyGraph;

/// Small built-in chronology so the page has something to show without a
/// backend.
fn sample_payload() -> (Value, Value, Value) {
	let events = json!([
		{ "id": 1, "name": "Creation", "year_start": -4004, "era": "Primeval", "event_type": "CREATION", "is_pivotal": true,
		  "description": "Beginning of the chronology." },
		{ "id": 2, "name": "The Flood", "year_start": -2348, "year_end": -2347, "era": "Primeval", "event_type": "JUDGMENT", "is_pivotal": true },
		{ "id": 3, "name": "Tower of Babel", "year_start": -2242, "era": "Primeval", "event_type": "JUDGMENT" },
		{ "id": 4, "name": "Call of Abraham", "year_start": "-1921", "era": "Patriarchal", "event_type": "COVENANT", "is_pivotal": true },
		{ "id": 5, "name": "Exodus", "year_start": -1491, "year_end": -1451, "era": "Exodus", "event_type": "DELIVERANCE", "is_pivotal": true },
		{ "id": 6, "name": "Conquest of Canaan", "year_start": -1451, "year_end": -1444, "era": "Conquest", "event_type": "CONQUEST" },
		{ "id": 7, "name": "Davidic Covenant", "year_start": -1042, "era": "Kingdom", "event_type": "COVENANT" },
		{ "id": 8, "name": "Fall of Jerusalem", "year_start": -588, "era": "Exile", "event_type": "JUDGMENT", "is_pivotal": true },
		{ "id": 9, "name": "Return from Exile", "year_start": -536, "era": "Exile", "event_type": "RESTORATION" },
		{ "id": 10, "name": "Crucifixion", "year_start": 33, "era": "New Testament", "event_type": "FULFILLMENT", "is_pivotal": true },
		{ "id": 11, "year_start": 70, "era": "New Testament", "event_type": "JUDGMENT" }
	]);
	let patterns = json!([
		{ "id": 1, "name": "Judgment and Mercy", "pattern_type": "CYCLE",
		  "description": "Rebellion followed by judgment and a preserved remnant." },
		{ "id": 2, "name": "Covenant Renewal", "pattern_type": "COVENANT" },
		{ "id": 3, "name": "Exile and Return", "pattern_type": "CYCLE" }
	]);
	let prophecies = json!([
		{ "id": 1, "reference": "Genesis 3:15", "text": "He shall bruise thy head.", "category": "Messianic" },
		{ "id": 2, "reference": "Jeremiah 25:11", "text": "These nations shall serve the king of Babylon seventy years.", "category": "Exile" },
		{ "id": 3, "text": "The sceptre shall not depart from Judah, nor a lawgiver from between his feet." },
		{ "id": 4, "reference": "Daniel 9:26", "category": "Messianic" }
	]);
	(events, patterns, prophecies)
}

fn sample_graph(include_prophecies: bool) -> Result<Graph, DecodeError> {
	let (events, patterns, prophecies) = sample_payload();
	let events = decode_events(&events)?;
	let patterns = decode_patterns(&patterns)?;
	let prophecies = if include_prophecies {
		decode_prophecies(&prophecies)?
	} else {
		Vec::new()
	};
	Ok(assemble(&events, &patterns, &prophecies))
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let include_prophecies = RwSignal::new(true);
	let selected = RwSignal::new(None::<NodeId>);

	let graph = Signal::derive(move || {
		sample_graph(include_prophecies.get()).unwrap_or_else(|err| {
			error!("sample chronology failed to decode: {err}");
			Graph::default()
		})
	});

	let on_select = Callback::new(move |id: Option<NodeId>| {
		debug!("selected node: {id:?}");
		selected.set(id);
	});

	view! {
		<div class="chronology-page">
			<header class="graph-overlay">
				<h1>"Chronology Network"</h1>
				<p class="subtitle">
					"Drag nodes to reposition. Scroll to zoom. Drag background to pan."
				</p>
				<label>
					<input
						type="checkbox"
						prop:checked=move || include_prophecies.get()
						on:change=move |ev| include_prophecies.set(event_target_checked(&ev))
					/>
					" Include prophecies"
				</label>
				<p class="selection">
					{move || match selected.get() {
						Some(id) => format!("Selected node {id}"),
						None => "Nothing selected".to_string(),
					}}
				</p>
			</header>
			<ChronologyGraph graph=graph on_select=on_select />
		</div>
	}
}
