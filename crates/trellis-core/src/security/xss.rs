//! XSS prevention utilities

use regex::Regex;
use std::sync::OnceLock;

/// Escape HTML special characters
///
/// # Examples
///
/// ```
/// use trellis_core::security::escape_html;
///
/// let input = "<script>alert('XSS')</script>";
/// let escaped = escape_html(input);
/// assert_eq!(escaped, "&lt;script&gt;alert(&#x27;XSS&#x27;)&lt;/script&gt;");
/// ```
pub fn escape_html(input: &str) -> String {
	input
		.replace('&', "&amp;")
		.replace('<', "&lt;")
		.replace('>', "&gt;")
		.replace('"', "&quot;")
		.replace('\'', "&#x27;")
}

/// Escape HTML attributes
///
/// # Examples
///
/// ```
/// use trellis_core::security::escape_html_attr;
///
/// let attr = r#"value" onload="alert('xss')"#;
/// let escaped = escape_html_attr(attr);
/// assert!(escaped.contains("&quot;"));
/// assert!(escaped.contains("&#x27;"));
/// ```
pub fn escape_html_attr(input: &str) -> String {
	escape_html(input)
		.replace('\n', "&#10;")
		.replace('\r', "&#13;")
}

/// Validate URLs and allow only safe protocols
///
/// Allows relative paths (`/path`, `./path`), anchor links (`#section`),
/// and safe protocols (`http://`, `https://`, `mailto:`, `ftp://`, `ftps://`).
///
/// # Examples
///
/// ```
/// use trellis_core::security::is_safe_url;
///
/// assert!(is_safe_url("https://example.com"));
/// assert!(is_safe_url("/path/to/page"));
/// assert!(is_safe_url("#top"));
/// assert!(!is_safe_url("javascript:alert(1)"));
/// assert!(!is_safe_url("data:text/html,<script>alert(1)</script>"));
/// assert!(!is_safe_url("../parent/path"));
/// ```
pub fn is_safe_url(url: &str) -> bool {
	let url = url.trim();
	let url_lower = url.to_lowercase();

	if url.starts_with('/') || url.starts_with("./") || url.starts_with('#') {
		return !url.starts_with("//");
	}

	let safe_protocols = ["http://", "https://", "mailto:", "ftp://", "ftps://"];

	safe_protocols
		.iter()
		.any(|protocol| url_lower.starts_with(protocol))
}

/// Tags whose body is dropped together with the tag when stripping.
const STRIPPED_BODY_TAGS: [&str; 2] = ["script", "style"];

/// Strip HTML tags with proper handling of malformed HTML
///
/// Handles:
/// - `>` inside quoted attributes (e.g., `<a title="x>y">`)
/// - Unclosed tags at end of input
/// - HTML comments (`<!-- ... -->`)
/// - `<script>` and `<style>` elements, whose bodies are removed as well
///
/// # Examples
///
/// ```
/// use trellis_core::security::strip_tags_safe;
///
/// assert_eq!(strip_tags_safe("<p>Hello <b>World</b></p>"), "Hello World");
/// assert_eq!(strip_tags_safe(r#"<a title="x>y">Link</a>"#), "Link");
/// assert_eq!(strip_tags_safe("Hello<!-- comment -->World"), "HelloWorld");
/// assert_eq!(strip_tags_safe("a<script>alert(1)</script>b"), "ab");
/// assert_eq!(strip_tags_safe("Hello<br"), "Hello");
/// ```
pub fn strip_tags_safe(html: &str) -> String {
	let mut result = String::with_capacity(html.len());
	let chars: Vec<char> = html.chars().collect();
	let len = chars.len();
	let mut i = 0;

	while i < len {
		let opens_markup = chars[i] == '<'
			&& chars
				.get(i + 1)
				.is_some_and(|c| c.is_ascii_alphabetic() || *c == '/' || *c == '!');
		if !opens_markup {
			result.push(chars[i]);
			i += 1;
			continue;
		}

		if i + 3 < len && chars[i + 1] == '!' && chars[i + 2] == '-' && chars[i + 3] == '-' {
			i += 4;
			let mut found_close = false;
			while i + 2 < len {
				if chars[i] == '-' && chars[i + 1] == '-' && chars[i + 2] == '>' {
					i += 3;
					found_close = true;
					break;
				}
				i += 1;
			}
			if !found_close {
				break;
			}
			continue;
		}

		// Inside a tag - skip until matching > (respecting quotes)
		i += 1;
		let closing = i < len && chars[i] == '/';
		let name: String = chars[i..]
			.iter()
			.skip(usize::from(closing))
			.take_while(|c| c.is_ascii_alphanumeric())
			.collect::<String>()
			.to_ascii_lowercase();
		let mut in_single_quote = false;
		let mut in_double_quote = false;

		while i < len {
			match chars[i] {
				'"' if !in_single_quote => in_double_quote = !in_double_quote,
				'\'' if !in_double_quote => in_single_quote = !in_single_quote,
				'>' if !in_single_quote && !in_double_quote => {
					i += 1;
					break;
				}
				_ => {}
			}
			i += 1;
		}

		if !closing && STRIPPED_BODY_TAGS.contains(&name.as_str()) {
			i = skip_element_body(&chars, i, &name);
		}
	}
	result
}

/// Returns the index just past `</name ...>` starting at `from`, or the end of
/// input when the element is never closed.
fn skip_element_body(chars: &[char], from: usize, name: &str) -> usize {
	let rest = chars[from..]
		.iter()
		.collect::<String>()
		.to_ascii_lowercase();
	let needle = format!("</{}", name);

	match rest.find(&needle) {
		Some(byte_pos) => {
			let close_start = from + rest[..byte_pos].chars().count();
			chars[close_start..]
				.iter()
				.position(|c| *c == '>')
				.map_or(chars.len(), |offset| close_start + offset + 1)
		}
		None => chars.len(),
	}
}

/// Sanitizer collaborator consumed by the router and by components.
///
/// Two operations: reduce user input to plain text, or keep a safe subset of
/// HTML.
pub trait XssSanitizer {
	/// Strips all markup, dropping `<script>`/`<style>` bodies entirely.
	fn plain_text(&self, user_input: &str) -> String;

	/// Keeps whitelisted tags and attributes, escaping everything else.
	fn html(&self, user_input: &str) -> String;
}

/// Whitelisted tags and the attributes each may carry.
const HTML_WHITELIST: &[(&str, &[&str])] = &[
	("a", &["href", "title", "target"]),
	("abbr", &["title"]),
	("b", &[]),
	("blockquote", &["cite"]),
	("br", &[]),
	("code", &[]),
	("del", &[]),
	("div", &[]),
	("em", &[]),
	("h1", &[]),
	("h2", &[]),
	("h3", &[]),
	("h4", &[]),
	("h5", &[]),
	("h6", &[]),
	("hr", &[]),
	("i", &[]),
	("img", &["src", "alt", "title", "width", "height"]),
	("li", &[]),
	("ol", &[]),
	("p", &[]),
	("pre", &[]),
	("small", &[]),
	("span", &[]),
	("strong", &[]),
	("sub", &[]),
	("sup", &[]),
	("table", &["width", "border", "align", "valign"]),
	("tbody", &["align", "valign"]),
	("td", &["width", "rowspan", "colspan", "align", "valign"]),
	("th", &["width", "rowspan", "colspan", "align", "valign"]),
	("thead", &["align", "valign"]),
	("tr", &["rowspan", "align", "valign"]),
	("u", &[]),
	("ul", &[]),
];

/// Attributes whose values are URLs and must pass [`is_safe_url`].
const URL_ATTRIBUTES: [&str; 3] = ["href", "src", "cite"];

static TAG_PATTERN: OnceLock<Regex> = OnceLock::new();
static ATTRIBUTE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn tag_pattern() -> &'static Regex {
	TAG_PATTERN.get_or_init(|| {
		Regex::new(r#"<(/?)([a-zA-Z][a-zA-Z0-9-]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#)
			.expect("tag pattern is a valid regex")
	})
}

fn attribute_pattern() -> &'static Regex {
	ATTRIBUTE_PATTERN.get_or_init(|| {
		Regex::new(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)(?:\s*=\s*("[^"]*"|'[^']*'|[^\s"'>]+))?"#)
			.expect("attribute pattern is a valid regex")
	})
}

/// Default [`XssSanitizer`] implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSanitizer;

impl DefaultSanitizer {
	/// Creates a new sanitizer.
	pub fn new() -> Self {
		Self
	}

	fn rebuild_tag(closing: bool, name: &str, raw_attributes: &str) -> Option<String> {
		let (_, allowed) = HTML_WHITELIST
			.iter()
			.find(|(tag, _)| tag.eq_ignore_ascii_case(name))?;
		let name = name.to_ascii_lowercase();

		if closing {
			return Some(format!("</{}>", name));
		}

		let mut tag = format!("<{}", name);
		for captures in attribute_pattern().captures_iter(raw_attributes) {
			let attribute = captures[1].to_ascii_lowercase();
			if !allowed.contains(&attribute.as_str()) {
				continue;
			}
			let value = captures
				.get(2)
				.map(|m| m.as_str().trim_matches(|c| c == '"' || c == '\''))
				.unwrap_or_default();
			if URL_ATTRIBUTES.contains(&attribute.as_str()) && !is_safe_url(value) {
				continue;
			}
			tag.push_str(&format!(" {}=\"{}\"", attribute, escape_html_attr(value)));
		}
		tag.push('>');
		Some(tag)
	}
}

impl XssSanitizer for DefaultSanitizer {
	fn plain_text(&self, user_input: &str) -> String {
		strip_tags_safe(user_input)
			.replace('<', "&lt;")
			.replace('>', "&gt;")
	}

	fn html(&self, user_input: &str) -> String {
		let mut output = String::with_capacity(user_input.len());
		let mut last = 0;

		for captures in tag_pattern().captures_iter(user_input) {
			let whole = captures.get(0).map_or(0..0, |m| m.range());
			output.push_str(&escape_angle_brackets(&user_input[last..whole.start]));

			let closing = !captures[1].is_empty();
			match Self::rebuild_tag(closing, &captures[2], &captures[3]) {
				Some(tag) => output.push_str(&tag),
				None => output.push_str(&escape_angle_brackets(&user_input[whole.clone()])),
			}
			last = whole.end;
		}
		output.push_str(&escape_angle_brackets(&user_input[last..]));
		output
	}
}

fn escape_angle_brackets(text: &str) -> String {
	text.replace('<', "&lt;").replace('>', "&gt;")
}
