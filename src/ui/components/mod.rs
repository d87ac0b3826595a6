mod command_input;
mod input;
mod product_form;

pub use command_input::{CommandEvent, CommandInput};
pub use input::{InputResult, TextInput};
pub use product_form::{FormEvent, FormField, ProductFormInput};

/// Result of a component handling a key event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Key was consumed, no event for parent to handle
  Handled,
  /// Key was consumed, here's an event for parent to process
  Event(T),
  /// Key was not consumed, parent should try next handler
  NotHandled,
}
