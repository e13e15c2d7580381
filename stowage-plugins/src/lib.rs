//! Built-in plugins for Stowage.
//!
//! - [`expires_plugin`] — lifetime annotation: values written inside a
//!   [`ExpiresHandle::with_expires`] scope carry an absolute deadline and
//!   disappear once it passes, lazily on access or proactively via the
//!   expiry driver.
//! - [`translate_plugin`] — type-tagged codecs: values with no JSON form
//!   (bigint by default) are encoded under a `type` concern at serialize
//!   time and decoded back on parse.

mod expires;
mod translate;

pub use expires::{expires_plugin, ExpiresHandle, ExpiresOptions};
pub use translate::{translate_plugin, TranslateEntry, TYPE_CONCERN};
