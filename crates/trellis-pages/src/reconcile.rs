//! In-place reconciliation
//!
//! [`reconcile`] brings the contents of a live element in line with a freshly
//! rendered one while keeping as many live nodes as it can. Elements at the
//! same position with the same tag are kept and have their attributes merged;
//! any structural mismatch replaces the parent's content wholesale. There is
//! no keyed diffing, so reordered lists are replaced rather than moved.

use crate::context::ID_PREFIX;
use crate::dom::{Node, NodeType};

/// Attributes that belong to the user once rendered.
const PRESERVED_ATTRIBUTES: &[&str] = &["id", "value"];

/// Make the children of `live` match the children of `fresh`
///
/// `live` itself is never replaced and its own attributes are left alone.
/// Nodes may be moved out of `fresh`.
pub fn reconcile(live: &Node, fresh: &Node) {
	if live.outer_html() == fresh.outer_html() || live.inner_html() == fresh.inner_html() {
		return;
	}

	let live_children = live.children();
	let fresh_children = fresh.children();
	if fresh_children.is_empty() || live_children.len() != fresh_children.len() {
		replace_content(live, fresh);
		return;
	}

	// Checked up front: recursing moves nodes out of `fresh`.
	if live_children
		.iter()
		.zip(&fresh_children)
		.any(|(l, f)| l.tag_name() != f.tag_name())
	{
		crate::debug_log!("Tag mismatch under <{}>; replacing content", live.tag_name());
		replace_content(live, fresh);
		return;
	}

	if !sync_character_data(live, fresh) {
		replace_content(live, fresh);
		return;
	}

	for (live_child, fresh_child) in live_children.iter().zip(&fresh_children) {
		merge_attributes(live_child, fresh_child);
		reconcile(live_child, fresh_child);
	}
}

fn replace_content(live: &Node, fresh: &Node) {
	live.replace_all_children(fresh.child_nodes());
}

/// Patch text and comment nodes between the elements in place
///
/// Returns `false` when the two child lists do not line up node for node.
fn sync_character_data(live: &Node, fresh: &Node) -> bool {
	let live_nodes = live.child_nodes();
	let fresh_nodes = fresh.child_nodes();
	if live_nodes.len() != fresh_nodes.len()
		|| live_nodes
			.iter()
			.zip(&fresh_nodes)
			.any(|(l, f)| l.node_type() != f.node_type())
	{
		return false;
	}

	for (live_node, fresh_node) in live_nodes.iter().zip(&fresh_nodes) {
		if matches!(live_node.node_type(), NodeType::Text | NodeType::Comment) {
			let data = fresh_node.data();
			if live_node.data() != data {
				live_node.set_data(data);
			}
		}
	}
	true
}

fn is_framework_id(id: Option<String>) -> bool {
	id.is_some_and(|id| id.starts_with(ID_PREFIX))
}

/// Whether `name` keeps its live value during a merge
///
/// `id` and `value` keep their live values. The exception is a framework id
/// (`tr-` prefix on either side), which follows the fresh tree: a nested
/// component re-rendered with a new id must be found under that id for its
/// wrapper lookups and deferred handler binding to resolve.
fn is_preserved(name: &str, live: &Node, fresh: &Node) -> bool {
	if !PRESERVED_ATTRIBUTES.contains(&name) {
		return false;
	}
	name != "id" || !(is_framework_id(live.id()) || is_framework_id(fresh.id()))
}

/// Copy `fresh`'s attributes onto `live` and drop the ones it lacks
pub fn merge_attributes(live: &Node, fresh: &Node) {
	for (name, value) in fresh.attributes() {
		if is_preserved(&name, live, fresh) {
			continue;
		}
		if live.attribute(&name).as_deref() != Some(value.as_str()) {
			live.set_attribute_unchecked(&name, &value);
		}
	}

	for (name, _) in live.attributes() {
		if !fresh.has_attribute(&name) && !is_preserved(&name, live, fresh) {
			live.remove_attribute(&name);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn container(html: &str) -> Node {
		let node = Node::element("div").unwrap();
		node.set_inner_html(html).unwrap();
		node
	}

	#[rstest]
	fn test_identical_markup_keeps_nodes() {
		let live = container("<p class=\"a\">one</p><p>two</p>");
		let first = live.children()[0].clone();
		let fresh = container("<p class=\"a\">one</p><p>two</p>");

		reconcile(&live, &fresh);

		assert_eq!(live.children()[0], first);
		assert_eq!(fresh.children().len(), 2);
	}

	#[rstest]
	fn test_text_change_patches_in_place() {
		let live = container("<p>Count: <b>1</b></p>");
		let paragraph = live.children()[0].clone();
		let bold = paragraph.children()[0].clone();

		reconcile(&live, &container("<p>Count: <b>2</b></p>"));

		assert_eq!(live.inner_html(), "<p>Count: <b>2</b></p>");
		assert_eq!(live.children()[0], paragraph);
		assert_eq!(paragraph.children()[0], bold);
	}

	#[rstest]
	fn test_mixed_text_outside_elements_is_updated() {
		let live = container("<p>Hello <b>x</b></p>");
		reconcile(&live, &container("<p>Bye <b>x</b></p>"));
		assert_eq!(live.inner_html(), "<p>Bye <b>x</b></p>");
	}

	#[rstest]
	fn test_count_mismatch_replaces_content() {
		let live = container("<li>a</li><li>b</li>");
		let first = live.children()[0].clone();

		reconcile(&live, &container("<li>a</li><li>b</li><li>c</li>"));

		assert_eq!(live.inner_html(), "<li>a</li><li>b</li><li>c</li>");
		assert_ne!(live.children()[0], first);
	}

	#[rstest]
	fn test_tag_mismatch_replaces_content() {
		let live = container("<p>a</p><span>b</span>");
		reconcile(&live, &container("<p>a</p><em>b</em>"));
		assert_eq!(live.inner_html(), "<p>a</p><em>b</em>");
	}

	#[rstest]
	fn test_user_id_and_value_are_preserved() {
		let live = container(r#"<input id="name" value="typed by user" class="old">"#);
		let fresh = container(r#"<input id="other" value="" class="new">"#);

		reconcile(&live, &fresh);

		let input = live.children()[0].clone();
		assert_eq!(input.id().as_deref(), Some("name"));
		assert_eq!(input.value().as_deref(), Some("typed by user"));
		assert_eq!(input.attribute("class").as_deref(), Some("new"));
	}

	#[rstest]
	fn test_preserved_attributes_are_not_removed() {
		let live = container(r#"<input id="name" value="x" disabled="true">"#);
		reconcile(&live, &container("<input>"));

		let input = live.children()[0].clone();
		assert_eq!(input.id().as_deref(), Some("name"));
		assert_eq!(input.value().as_deref(), Some("x"));
		assert!(!input.has_attribute("disabled"));
	}

	#[rstest]
	fn test_framework_ids_follow_fresh_tree() {
		let live = container(r#"<div id="tr-old"><span>1</span></div>"#);
		reconcile(&live, &container(r#"<div id="tr-new"><span>2</span></div>"#));

		assert_eq!(live.children()[0].id().as_deref(), Some("tr-new"));
		assert_eq!(live.inner_html(), r#"<div id="tr-new"><span>2</span></div>"#);
	}

	#[rstest]
	fn test_framework_id_replaces_live_framework_id_on_leaf() {
		let live = container(r#"<span id="tr-live" value="kept">a</span>"#);
		reconcile(&live, &container(r#"<span id="tr-fresh" value="new">b</span>"#));

		let span = live.children()[0].clone();
		assert_eq!(span.id().as_deref(), Some("tr-fresh"));
		assert_eq!(span.value().as_deref(), Some("kept"));
		assert_eq!(span.text_content(), "b");
	}

	#[rstest]
	fn test_root_attributes_untouched() {
		let live = Node::element("div").unwrap();
		live.set_attribute("id", "root").unwrap();
		live.set_inner_html("<p>a</p>").unwrap();
		let fresh = Node::element("div").unwrap();
		fresh.set_inner_html("<p>b</p>").unwrap();

		reconcile(&live, &fresh);

		assert_eq!(live.id().as_deref(), Some("root"));
		assert_eq!(live.inner_html(), "<p>b</p>");
	}

	#[rstest]
	fn test_empty_fresh_clears_live() {
		let live = container("<p>a</p>");
		reconcile(&live, &container("plain text"));
		assert_eq!(live.inner_html(), "plain text");
	}
}
