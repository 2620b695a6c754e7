//! HTML fragment parsing and serialization
//!
//! The parser accepts the markup the framework itself produces plus the
//! usual hand-written HTML: quoted and unquoted attributes, void elements,
//! comments, character references and raw-text `<script>`/`<style>` bodies.
//! Unmatched end tags close the nearest open element of the same name, or
//! are ignored when none is open.

use super::DomError;
use super::node::{Node, NodeType, is_valid_attribute_name};

/// Deepest element nesting accepted by [`parse_fragment`].
pub const MAX_NESTING_DEPTH: usize = 512;

/// Elements that never have children or an end tag.
pub const VOID_ELEMENTS: [&str; 13] = [
	"area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
	"wbr",
];

const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

/// Whether `tag` is a void element
pub fn is_void_element(tag: &str) -> bool {
	VOID_ELEMENTS.contains(&tag)
}

struct Parser<'a> {
	input: &'a str,
	pos: usize,
	/// Open elements; the first entry is a scratch container.
	stack: Vec<Node>,
}

/// Parse `html` into detached top-level nodes
pub fn parse_fragment(html: &str) -> Result<Vec<Node>, DomError> {
	let container = Node::element_unchecked("template");
	let mut parser = Parser {
		input: html,
		pos: 0,
		stack: vec![container.clone()],
	};
	parser.run()?;

	let nodes = container.child_nodes();
	for node in &nodes {
		node.remove();
	}
	Ok(nodes)
}

impl<'a> Parser<'a> {
	fn rest(&self) -> &'a str {
		&self.input[self.pos..]
	}

	fn current(&self) -> &Node {
		// The scratch container is never popped.
		&self.stack[self.stack.len() - 1]
	}

	fn run(&mut self) -> Result<(), DomError> {
		while self.pos < self.input.len() {
			let rest = self.rest();
			if rest.starts_with("<!--") {
				self.parse_comment();
			} else if rest.starts_with("</") && starts_with_letter(&rest[2..]) {
				self.parse_end_tag();
			} else if rest.starts_with("<!") || rest.starts_with("<?") {
				self.skip_declaration();
			} else if rest.starts_with('<') && starts_with_letter(&rest[1..]) {
				self.parse_start_tag()?;
			} else {
				self.parse_text();
			}
		}
		Ok(())
	}

	fn append(&self, node: Node) {
		self.current().push_parsed_child(node);
	}

	fn append_text(&self, text: String) {
		if text.is_empty() {
			return;
		}
		if let Some(last) = self.current().child_nodes().last()
			&& last.node_type() == NodeType::Text
		{
			last.set_data(last.data() + &text);
			return;
		}
		self.append(Node::text(text));
	}

	fn parse_text(&mut self) {
		// A lone `<` that opens nothing is literal text.
		let start = self.pos;
		let rest = self.rest();
		let first = rest.chars().next().map_or(0, char::len_utf8);
		self.pos += rest[first..].find('<').map_or(rest.len(), |i| i + first);
		let decoded = decode_entities(&self.input[start..self.pos]);
		self.append_text(decoded);
	}

	fn parse_comment(&mut self) {
		let body_start = self.pos + 4;
		match self.input[body_start..].find("-->") {
			Some(end) => {
				let data = self.input[body_start..body_start + end].to_string();
				self.pos = body_start + end + 3;
				self.append(Node::comment(data));
			}
			None => {
				let data = self.input[body_start..].to_string();
				self.pos = self.input.len();
				self.append(Node::comment(data));
			}
		}
	}

	fn skip_declaration(&mut self) {
		self.pos = self
			.rest()
			.find('>')
			.map_or(self.input.len(), |end| self.pos + end + 1);
	}

	fn read_name(&mut self) -> String {
		let rest = self.rest();
		let end = rest
			.find(|c: char| c.is_whitespace() || c == '/' || c == '>')
			.unwrap_or(rest.len());
		let name = rest[..end].to_ascii_lowercase();
		self.pos += end;
		name
	}

	fn skip_whitespace(&mut self) {
		let rest = self.rest();
		let trimmed = rest.trim_start();
		self.pos += rest.len() - trimmed.len();
	}

	fn parse_end_tag(&mut self) {
		self.pos += 2;
		let name = self.read_name();
		self.skip_declaration();

		if let Some(index) = self
			.stack
			.iter()
			.rposition(|node| node.tag_name() == name)
			.filter(|index| *index > 0)
		{
			self.stack.truncate(index);
		}
	}

	fn parse_start_tag(&mut self) -> Result<(), DomError> {
		self.pos += 1;
		let name = self.read_name();
		let element = Node::element_unchecked(&name);
		let mut self_closing = false;

		loop {
			self.skip_whitespace();
			let rest = self.rest();
			if rest.is_empty() {
				break;
			}
			if rest.starts_with("/>") {
				self.pos += 2;
				self_closing = true;
				break;
			}
			if rest.starts_with('>') {
				self.pos += 1;
				break;
			}
			if rest.starts_with('/') {
				self.pos += 1;
				continue;
			}
			let (attribute, value) = self.parse_attribute();
			if is_valid_attribute_name(&attribute) && !element.has_attribute(&attribute) {
				element.set_attribute_unchecked(&attribute, &value);
			}
		}

		self.append(element.clone());

		if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
			self.parse_raw_text(&element, &name);
			return Ok(());
		}
		if self_closing || is_void_element(&name) {
			return Ok(());
		}
		if self.stack.len() > MAX_NESTING_DEPTH {
			return Err(DomError::NestingTooDeep {
				limit: MAX_NESTING_DEPTH,
			});
		}
		self.stack.push(element);
		Ok(())
	}

	fn parse_attribute(&mut self) -> (String, String) {
		let rest = self.rest();
		let end = rest
			.find(|c: char| c.is_whitespace() || c == '=' || c == '>' || c == '/')
			.unwrap_or(rest.len())
			.max(rest.chars().next().map_or(0, char::len_utf8));
		let name = rest[..end].to_ascii_lowercase();
		self.pos += end;

		self.skip_whitespace();
		if !self.rest().starts_with('=') {
			return (name, String::new());
		}
		self.pos += 1;
		self.skip_whitespace();

		let rest = self.rest();
		let raw = match rest.chars().next() {
			Some(quote @ ('"' | '\'')) => {
				let body = &rest[1..];
				match body.find(quote) {
					Some(close) => {
						self.pos += close + 2;
						&body[..close]
					}
					None => {
						self.pos = self.input.len();
						body
					}
				}
			}
			_ => {
				let end = rest
					.find(|c: char| c.is_whitespace() || c == '>')
					.unwrap_or(rest.len());
				self.pos += end;
				&rest[..end]
			}
		};
		(name, decode_entities(raw))
	}

	fn parse_raw_text(&mut self, element: &Node, name: &str) {
		let closing = format!("</{}", name);
		let lower = self.rest().to_ascii_lowercase();
		let end = lower.find(&closing).unwrap_or(lower.len());
		let body = self.rest()[..end].to_string();
		self.pos += end;
		if !body.is_empty() {
			element.push_parsed_child(Node::text(body));
		}
		if self.pos < self.input.len() {
			self.skip_declaration();
		}
	}
}

fn starts_with_letter(text: &str) -> bool {
	text.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
}

/// Decode character references in text or attribute values
pub fn decode_entities(text: &str) -> String {
	if !text.contains('&') {
		return text.to_string();
	}

	let mut output = String::with_capacity(text.len());
	let mut rest = text;
	while let Some(amp) = rest.find('&') {
		output.push_str(&rest[..amp]);
		rest = &rest[amp..];

		let decoded = rest[1..]
			.find(';')
			.filter(|semi| *semi <= 10)
			.and_then(|semi| decode_reference(&rest[1..semi + 1]).map(|c| (c, semi + 2)));

		match decoded {
			Some((c, consumed)) => {
				output.push(c);
				rest = &rest[consumed..];
			}
			None => {
				output.push('&');
				rest = &rest[1..];
			}
		}
	}
	output.push_str(rest);
	output
}

fn decode_reference(reference: &str) -> Option<char> {
	if let Some(numeric) = reference.strip_prefix('#') {
		let code = match numeric.strip_prefix(['x', 'X']) {
			Some(hex) => u32::from_str_radix(hex, 16).ok()?,
			None => numeric.parse().ok()?,
		};
		return char::from_u32(code);
	}
	match reference {
		"amp" => Some('&'),
		"lt" => Some('<'),
		"gt" => Some('>'),
		"quot" => Some('"'),
		"apos" => Some('\''),
		"nbsp" => Some('\u{a0}'),
		"copy" => Some('©'),
		"reg" => Some('®'),
		"hellip" => Some('…'),
		"mdash" => Some('—'),
		"ndash" => Some('–'),
		_ => None,
	}
}

/// Escape text content: `&`, `<`, `>`, and non-breaking spaces
pub fn escape_text(text: &str) -> String {
	text.replace('&', "&amp;")
		.replace('\u{a0}', "&nbsp;")
		.replace('<', "&lt;")
		.replace('>', "&gt;")
}

/// Escape an attribute value: `&`, `"`, and non-breaking spaces
pub fn escape_attribute(value: &str) -> String {
	value
		.replace('&', "&amp;")
		.replace('\u{a0}', "&nbsp;")
		.replace('"', "&quot;")
}

/// Markup of `node` itself
pub fn serialize(node: &Node) -> String {
	let mut output = String::new();
	write_node(node, &mut output);
	output
}

/// Markup of `node`'s children
pub fn serialize_children(node: &Node) -> String {
	let mut output = String::new();
	let raw = RAW_TEXT_ELEMENTS.contains(&node.tag_name());
	for child in node.child_nodes() {
		if raw && child.node_type() == NodeType::Text {
			output.push_str(&child.data());
		} else {
			write_node(&child, &mut output);
		}
	}
	output
}

fn write_node(node: &Node, output: &mut String) {
	match node.node_type() {
		NodeType::Text => output.push_str(&escape_text(&node.data())),
		NodeType::Comment => {
			output.push_str("<!--");
			output.push_str(&node.data());
			output.push_str("-->");
		}
		NodeType::Document => output.push_str(&serialize_children(node)),
		NodeType::Element => {
			let tag = node.tag_name();
			output.push('<');
			output.push_str(tag);
			for (name, value) in node.attributes() {
				output.push(' ');
				output.push_str(&name);
				output.push_str("=\"");
				output.push_str(&escape_attribute(&value));
				output.push('"');
			}
			output.push('>');
			if is_void_element(tag) {
				return;
			}
			output.push_str(&serialize_children(node));
			output.push_str("</");
			output.push_str(tag);
			output.push('>');
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn round_trip(html: &str) -> String {
		let container = Node::element("div").unwrap();
		container.set_inner_html(html).unwrap();
		container.inner_html()
	}

	#[rstest]
	#[case("<p>hello</p>", "<p>hello</p>")]
	#[case("<P CLASS=a>x</P>", r#"<p class="a">x</p>"#)]
	#[case("<input type='checkbox' checked>", r#"<input type="checkbox" checked="">"#)]
	#[case("<br/>text", "<br>text")]
	#[case("a &amp; b &lt; c", "a &amp; b &lt; c")]
	#[case("<!-- note --><b>x</b>", "<!-- note --><b>x</b>")]
	#[case("<div><span>unclosed</div>", "<div><span>unclosed</span></div>")]
	#[case("stray</em>end", "strayend")]
	#[case("1 < 2", "1 &lt; 2")]
	#[case(r#"<a title="x>y">t</a>"#, r#"<a title="x>y">t</a>"#)]
	#[case("<script>if (a < b) {}</script>", "<script>if (a < b) {}</script>")]
	#[case("<!DOCTYPE html><i>x</i>", "<i>x</i>")]
	#[case("&#60;&#x3E;&bogus;", "&lt;&gt;&amp;bogus;")]
	fn test_round_trip(#[case] input: &str, #[case] expected: &str) {
		assert_eq!(round_trip(input), expected);
	}

	#[rstest]
	fn test_attribute_escaping() {
		let node = Node::element("div").unwrap();
		node.set_attribute("title", r#"say "hi" & go"#).unwrap();
		assert_eq!(
			node.outer_html(),
			r#"<div title="say &quot;hi&quot; &amp; go"></div>"#
		);
	}

	#[rstest]
	fn test_duplicate_attribute_keeps_first() {
		assert_eq!(round_trip(r#"<p id="a" id="b"></p>"#), r#"<p id="a"></p>"#);
	}

	#[rstest]
	fn test_nesting_limit() {
		let html = "<div>".repeat(MAX_NESTING_DEPTH + 1);
		assert_eq!(
			parse_fragment(&html).unwrap_err(),
			DomError::NestingTooDeep {
				limit: MAX_NESTING_DEPTH
			}
		);
	}

	#[rstest]
	fn test_parsed_nodes_are_detached() {
		let nodes = parse_fragment("<p></p><p></p>").unwrap();
		assert_eq!(nodes.len(), 2);
		assert!(nodes.iter().all(|node| node.parent().is_none()));
	}
}
