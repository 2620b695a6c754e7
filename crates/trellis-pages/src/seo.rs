//! Title and meta tag management
//!
//! Pages describe themselves for search engines and link previews through
//! the [`SeoService`] collaborator. [`DocumentSeo`] writes to the document
//! head and falls back to whatever the head carried when it was created.

use std::cell::RefCell;
use std::fmt;

use crate::dom::{Document, Node};

/// `name` of the description meta tag.
pub const DESCRIPTION_META: &str = "description";

/// `name` of the preview-image meta tag.
pub const IMAGE_META: &str = "image";

/// A `<meta name content>` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaTag {
	/// `name` attribute
	pub name: String,
	/// `content` attribute
	pub content: String,
}

impl MetaTag {
	/// Meta tag `name` with `content`
	pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			content: content.into(),
		}
	}
}

/// SEO collaborator
pub trait SeoService {
	/// Apply page defaults; `None` or empty values restore the originals.
	fn set_default_tags(&self, title: Option<&str>, description: Option<&str>, image_url: Option<&str>);

	/// Set the document title.
	fn set_title(&self, title: &str);

	/// Set the description meta tag.
	fn set_description(&self, description: &str);

	/// Set the preview-image meta tag.
	fn set_image_url(&self, image_url: &str);

	/// Set arbitrary meta tags, creating the missing ones.
	fn set_meta_tags(&self, tags: &[MetaTag]);
}

#[derive(Debug, Default)]
struct Originals {
	title: String,
	description: String,
	image_url: String,
}

/// [`SeoService`] writing to a [`Document`]'s head
///
/// The original title is the document title at construction, or the part
/// after `|` when the title already carries a page prefix.
pub struct DocumentSeo {
	document: Document,
	originals: RefCell<Originals>,
}

impl DocumentSeo {
	/// Capture the originals of `document`
	pub fn new(document: Document) -> Self {
		let seo = Self {
			document,
			originals: RefCell::new(Originals::default()),
		};
		seo.capture_originals();
		seo
	}

	/// Re-read the originals from the head
	pub fn capture_originals(&self) {
		let title = self.document.title();
		let title = match title.split_once('|') {
			Some((_, site)) => site.trim().to_string(),
			None => title,
		};
		let content = |name: &str| {
			self.document
				.meta(name)
				.and_then(|meta| meta.attribute("content"))
				.unwrap_or_default()
		};

		*self.originals.borrow_mut() = Originals {
			title,
			description: content(DESCRIPTION_META),
			image_url: content(IMAGE_META),
		};
	}

	/// Title restored by [`SeoService::set_default_tags`]
	pub fn original_title(&self) -> String {
		self.originals.borrow().title.clone()
	}

	fn update_meta_tag(&self, name: &str, content: &str) {
		if let Some(meta) = self.document.meta(name) {
			meta.set_attribute_unchecked("content", content);
			return;
		}

		let meta = Node::element_unchecked("meta");
		meta.set_attribute_unchecked("name", name);
		meta.set_attribute_unchecked("content", content);
		if let Err(error) = self.document.head().append_child(&meta) {
			crate::warn_log!("Could not add meta tag '{}': {}", name, error);
		}
	}
}

fn non_empty(value: Option<&str>) -> Option<&str> {
	value.filter(|value| !value.is_empty())
}

impl SeoService for DocumentSeo {
	fn set_default_tags(&self, title: Option<&str>, description: Option<&str>, image_url: Option<&str>) {
		let originals = {
			let originals = self.originals.borrow();
			(
				originals.title.clone(),
				originals.description.clone(),
				originals.image_url.clone(),
			)
		};
		self.set_title(non_empty(title).unwrap_or(&originals.0));
		self.set_description(non_empty(description).unwrap_or(&originals.1));
		self.set_image_url(non_empty(image_url).unwrap_or(&originals.2));
	}

	fn set_title(&self, title: &str) {
		let original = self.original_title();
		if title == original || original.is_empty() {
			self.document.set_title(title);
		} else {
			self.document.set_title(&format!("{} | {}", title, original));
		}
	}

	fn set_description(&self, description: &str) {
		self.update_meta_tag(DESCRIPTION_META, description);
	}

	fn set_image_url(&self, image_url: &str) {
		self.update_meta_tag(IMAGE_META, image_url);
	}

	fn set_meta_tags(&self, tags: &[MetaTag]) {
		for tag in tags {
			self.update_meta_tag(&tag.name, &tag.content);
		}
	}
}

impl fmt::Debug for DocumentSeo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DocumentSeo")
			.field("originals", &self.originals.borrow())
			.finish_non_exhaustive()
	}
}
