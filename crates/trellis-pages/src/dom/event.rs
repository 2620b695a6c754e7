//! DOM events
//!
//! [`EventType`] enumerates the events the framework binds through `on*`
//! attributes; [`Event`] is the object handed to handlers during dispatch.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use super::node::Node;

/// Callback invoked when an event reaches a node
pub type EventHandler = Rc<dyn Fn(&Event)>;

/// Event types supported by the document model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
	// Mouse events
	/// `click`
	Click,
	/// `dblclick`
	DblClick,
	/// `mousedown`
	MouseDown,
	/// `mouseup`
	MouseUp,
	/// `mouseenter`
	MouseEnter,
	/// `mouseleave`
	MouseLeave,
	/// `mousemove`
	MouseMove,
	/// `mouseover`
	MouseOver,
	/// `mouseout`
	MouseOut,
	// Keyboard events
	/// `keydown`
	KeyDown,
	/// `keyup`
	KeyUp,
	/// `keypress`
	KeyPress,
	// Form events
	/// `input`
	Input,
	/// `change`
	Change,
	/// `submit`
	Submit,
	/// `focus`
	Focus,
	/// `blur`
	Blur,
	// Touch events
	/// `touchstart`
	TouchStart,
	/// `touchend`
	TouchEnd,
	/// `touchmove`
	TouchMove,
	/// `touchcancel`
	TouchCancel,
	// Drag events
	/// `dragstart`
	DragStart,
	/// `drag`
	Drag,
	/// `drop`
	Drop,
	/// `dragenter`
	DragEnter,
	/// `dragleave`
	DragLeave,
	/// `dragover`
	DragOver,
	/// `dragend`
	DragEnd,
	// Other events
	/// `load`
	Load,
	/// `error`
	Error,
	/// `scroll`
	Scroll,
	/// `resize`
	Resize,
}

impl EventType {
	/// Every supported event type.
	pub const ALL: [EventType; 32] = [
		EventType::Click,
		EventType::DblClick,
		EventType::MouseDown,
		EventType::MouseUp,
		EventType::MouseEnter,
		EventType::MouseLeave,
		EventType::MouseMove,
		EventType::MouseOver,
		EventType::MouseOut,
		EventType::KeyDown,
		EventType::KeyUp,
		EventType::KeyPress,
		EventType::Input,
		EventType::Change,
		EventType::Submit,
		EventType::Focus,
		EventType::Blur,
		EventType::TouchStart,
		EventType::TouchEnd,
		EventType::TouchMove,
		EventType::TouchCancel,
		EventType::DragStart,
		EventType::Drag,
		EventType::Drop,
		EventType::DragEnter,
		EventType::DragLeave,
		EventType::DragOver,
		EventType::DragEnd,
		EventType::Load,
		EventType::Error,
		EventType::Scroll,
		EventType::Resize,
	];

	/// DOM event name, e.g. `"click"`.
	pub fn as_str(&self) -> &'static str {
		match self {
			EventType::Click => "click",
			EventType::DblClick => "dblclick",
			EventType::MouseDown => "mousedown",
			EventType::MouseUp => "mouseup",
			EventType::MouseEnter => "mouseenter",
			EventType::MouseLeave => "mouseleave",
			EventType::MouseMove => "mousemove",
			EventType::MouseOver => "mouseover",
			EventType::MouseOut => "mouseout",
			EventType::KeyDown => "keydown",
			EventType::KeyUp => "keyup",
			EventType::KeyPress => "keypress",
			EventType::Input => "input",
			EventType::Change => "change",
			EventType::Submit => "submit",
			EventType::Focus => "focus",
			EventType::Blur => "blur",
			EventType::TouchStart => "touchstart",
			EventType::TouchEnd => "touchend",
			EventType::TouchMove => "touchmove",
			EventType::TouchCancel => "touchcancel",
			EventType::DragStart => "dragstart",
			EventType::Drag => "drag",
			EventType::Drop => "drop",
			EventType::DragEnter => "dragenter",
			EventType::DragLeave => "dragleave",
			EventType::DragOver => "dragover",
			EventType::DragEnd => "dragend",
			EventType::Load => "load",
			EventType::Error => "error",
			EventType::Scroll => "scroll",
			EventType::Resize => "resize",
		}
	}

	/// Resolves an `on*` attribute name (`"onclick"`, case-insensitive) to its
	/// event type.
	pub fn from_attribute(attribute: &str) -> Option<EventType> {
		let lower = attribute.to_ascii_lowercase();
		lower.strip_prefix("on")?.parse().ok()
	}
}

impl fmt::Display for EventType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Error returned when parsing an unknown event name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event type '{0}'")]
pub struct UnknownEventType(pub String);

impl FromStr for EventType {
	type Err = UnknownEventType;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		EventType::ALL
			.into_iter()
			.find(|event_type| event_type.as_str() == s)
			.ok_or_else(|| UnknownEventType(s.to_string()))
	}
}

/// Event being dispatched through the tree
pub struct Event {
	event_type: EventType,
	target: RefCell<Option<Node>>,
	current_target: RefCell<Option<Node>>,
	default_prevented: Cell<bool>,
	propagation_stopped: Cell<bool>,
	bubbles: bool,
}

impl Event {
	/// A bubbling event of the given type.
	pub fn new(event_type: EventType) -> Self {
		Self {
			event_type,
			target: RefCell::new(None),
			current_target: RefCell::new(None),
			default_prevented: Cell::new(false),
			propagation_stopped: Cell::new(false),
			bubbles: !matches!(
				event_type,
				EventType::Focus
					| EventType::Blur | EventType::MouseEnter
					| EventType::MouseLeave
					| EventType::Load | EventType::Scroll
			),
		}
	}

	/// Event type
	pub fn event_type(&self) -> EventType {
		self.event_type
	}

	/// Node the event was dispatched at
	pub fn target(&self) -> Option<Node> {
		self.target.borrow().clone()
	}

	/// Node whose handlers are currently running
	pub fn current_target(&self) -> Option<Node> {
		self.current_target.borrow().clone()
	}

	/// Cancel the default action
	pub fn prevent_default(&self) {
		self.default_prevented.set(true);
	}

	/// Whether `prevent_default` was called
	pub fn default_prevented(&self) -> bool {
		self.default_prevented.get()
	}

	/// Stop bubbling after the current node
	pub fn stop_propagation(&self) {
		self.propagation_stopped.set(true);
	}

	/// Whether `stop_propagation` was called
	pub fn propagation_stopped(&self) -> bool {
		self.propagation_stopped.get()
	}

	/// Whether the event travels up to ancestors
	pub fn bubbles(&self) -> bool {
		self.bubbles
	}

	pub(crate) fn set_target(&self, node: &Node) {
		*self.target.borrow_mut() = Some(node.clone());
	}

	pub(crate) fn set_current_target(&self, node: Option<&Node>) {
		*self.current_target.borrow_mut() = node.cloned();
	}
}

impl fmt::Debug for Event {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Event")
			.field("event_type", &self.event_type)
			.field("default_prevented", &self.default_prevented.get())
			.finish()
	}
}
