use std::any::Any;

/// Extracts a readable message from a panic payload.
///
/// Panics raised through `panic!` carry either a `&'static str` or a
/// `String`; anything else is reported generically.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("non-string panic payload")
    }
}
