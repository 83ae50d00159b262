use leptos::prelude::*;

use crate::chronology::{Entity, Node};

fn field(label: &'static str, value: String) -> impl IntoView {
	view! {
		<div class="details-field">
			<span class="details-label">{label}</span>
			<span class="details-value">{value}</span>
		</div>
	}
}

fn entity_fields(entity: &Entity) -> AnyView {
	match entity {
		Entity::Event(e) => view! {
			{field("Date", e.span())}
			{(!e.era.is_empty()).then(|| field("Era", e.era.clone()))}
			{(!e.event_type.is_empty()).then(|| field("Type", e.event_type.clone()))}
			{e.is_pivotal.then(|| field("Pivotal", "Yes".to_string()))}
			{e.description.clone().map(|d| view! { <p class="details-description">{d}</p> })}
		}
		.into_any(),
		Entity::Pattern(p) => view! {
			{(!p.pattern_type.is_empty()).then(|| field("Type", p.pattern_type.clone()))}
			{p.description.clone().map(|d| view! { <p class="details-description">{d}</p> })}
		}
		.into_any(),
		Entity::Prophecy(p) => view! {
			{p.reference.clone().map(|r| field("Reference", r))}
			{p.category.clone().map(|c| field("Category", c))}
			{p.text.clone().map(|t| view! { <p class="details-description">{t}</p> })}
		}
		.into_any(),
	}
}

/// Side panel describing the selected node; renders nothing without a
/// selection.
#[component]
pub fn NodeDetails(
	/// Node to describe.
	#[prop(into)]
	node: Signal<Option<Node>>,
	/// Called by the close button.
	#[prop(into)]
	on_close: Callback<()>,
) -> impl IntoView {
	move || {
		node.get().map(|node| {
			view! {
				<aside class=format!("graph-details graph-details-{}", node.kind.as_str())>
					<header>
						<h3>{node.label.clone()}</h3>
						<button title="Close" on:click=move |_| on_close.run(())>
							"×"
						</button>
					</header>
					<div class="details-kind">{node.kind.as_str()}</div>
					{entity_fields(&node.entity)}
				</aside>
			}
		})
	}
}
