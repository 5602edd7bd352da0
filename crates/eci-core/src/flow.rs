//! The flow outcome type and the transformer composition combinator (spec §3-4).

use crate::error::EciError;

/// The result of applying one step of a parse pipeline to an accumulated buffer.
///
/// `Go` carries a fully parsed value and ends the pipeline for this input.
/// `Wait` means the buffer is well-formed so far but incomplete — more bytes
/// are needed. `Reject` means the buffer can never become valid and should be
/// discarded. `Error` is a terminal failure (e.g. a structured `ERR` response)
/// that should propagate straight to the caller.
#[derive(Debug)]
pub enum FlowResult<T> {
    Go(T),
    Wait,
    Reject,
    Error(EciError),
}

impl<T> FlowResult<T> {
    /// Chains a further step onto a `Go` value; any other variant short-circuits.
    pub fn bind<U>(self, next: impl FnOnce(T) -> FlowResult<U>) -> FlowResult<U> {
        match self {
            FlowResult::Go(value) => next(value),
            FlowResult::Wait => FlowResult::Wait,
            FlowResult::Reject => FlowResult::Reject,
            FlowResult::Error(e) => FlowResult::Error(e),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FlowResult<U> {
        self.bind(|v| FlowResult::Go(f(v)))
    }

    pub fn is_go(&self) -> bool {
        matches!(self, FlowResult::Go(_))
    }
}

/// A pipeline from a raw buffer to a parsed value `Out`.
///
/// Every pipeline starts from the accumulated buffer as `&str`; subsequent
/// steps operate on owned intermediate values (`Vec<String>`, `String`,
/// parsed numbers, ...). [`Flow::then`] is the sequencing combinator named in
/// spec.md §3 ("a sequencing combinator that chains `Go` through subsequent
/// steps").
pub struct Flow<Out> {
    f: std::sync::Arc<dyn Fn(&str) -> FlowResult<Out> + Send + Sync>,
}

impl<Out> Clone for Flow<Out> {
    fn clone(&self) -> Self {
        Self { f: self.f.clone() }
    }
}

impl<Out: 'static> Flow<Out> {
    pub fn new(f: impl Fn(&str) -> FlowResult<Out> + Send + Sync + 'static) -> Self {
        Self { f: std::sync::Arc::new(f) }
    }

    pub fn apply(&self, buffer: &str) -> FlowResult<Out> {
        (self.f)(buffer)
    }

    /// Appends a step that consumes this pipeline's `Go` value by ownership.
    pub fn then<Next: 'static>(
        self,
        next: impl Fn(Out) -> FlowResult<Next> + Send + Sync + 'static,
    ) -> Flow<Next> {
        Flow::new(move |buffer: &str| self.apply(buffer).bind(&next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_short_circuits_on_non_go() {
        let wait: FlowResult<i32> = FlowResult::Wait;
        let result = wait.bind(|v| FlowResult::Go(v + 1));
        assert!(matches!(result, FlowResult::Wait));
    }

    #[test]
    fn then_chains_go_values() {
        let flow: Flow<i32> = Flow::new(|buf: &str| {
            if buf.len() >= 3 {
                FlowResult::Go(buf.to_string())
            } else {
                FlowResult::Wait
            }
        })
        .then(|s: String| FlowResult::Go(s.len() as i32));

        assert!(matches!(flow.apply("ab"), FlowResult::Wait));
        assert!(matches!(flow.apply("abc"), FlowResult::Go(3)));
    }
}
