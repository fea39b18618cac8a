//! The evaluation context: scoped variable frames plus field and function
//! resolution.
//!
//! One context exists per evaluation call. Frames are pushed on entry to a
//! nested computation scope (output-field evaluation, user function
//! application) and popped on exit; [`EvaluationContext::with_frame`] pairs
//! the two so failure paths cannot leak frames.
//!
//! Lookup walks the frame stack top-down, falls back to the input-argument
//! bindings, and beyond that delegates to the model's static catalog (an
//! external collaborator).

use indexmap::IndexMap;

use crate::schema::{DerivedField, FieldDecl, FunctionDef};
use crate::value::TypedValue;

/// The model's static field/derived-field/function catalog.
///
/// Supplied by the model description; resolution by name only. All methods
/// return `None` for unknown names; whether that is an error depends on the
/// caller.
pub trait FieldCatalog {
    fn data_field(&self, name: &str) -> Option<&FieldDecl>;

    fn derived_field(&self, name: &str) -> Option<&DerivedField>;

    fn function(&self, name: &str) -> Option<&FunctionDef>;
}

/// An ordered stack of name-to-value frames over the input arguments.
pub struct EvaluationContext<'a> {
    catalog: &'a dyn FieldCatalog,
    arguments: IndexMap<String, Option<TypedValue>>,
    frames: Vec<IndexMap<String, TypedValue>>,
    warnings: Vec<String>,
}

impl<'a> EvaluationContext<'a> {
    /// Create a context over prepared input arguments.
    ///
    /// A `None` argument value records that the field was supplied but
    /// missing; an absent key means the field was never supplied at all.
    pub fn new(
        catalog: &'a dyn FieldCatalog,
        arguments: IndexMap<String, Option<TypedValue>>,
    ) -> Self {
        Self {
            catalog,
            arguments,
            frames: Vec::new(),
            warnings: Vec::new(),
        }
    }

    // =========================================================================
    // Frames
    // =========================================================================

    /// Push an empty frame. Callers must pair this with [`pop_frame`], on
    /// error paths included; prefer [`with_frame`].
    ///
    /// [`pop_frame`]: Self::pop_frame
    /// [`with_frame`]: Self::with_frame
    pub fn push_frame(&mut self) {
        self.frames.push(IndexMap::new());
    }

    /// Pop the most recently pushed frame.
    ///
    /// # Panics
    ///
    /// Panics if no frame is pushed. An unbalanced pop is a programming
    /// error, not a runtime condition.
    pub fn pop_frame(&mut self) -> IndexMap<String, TypedValue> {
        self.frames.pop().expect("pop_frame without matching push_frame")
    }

    /// Run `f` inside a fresh frame, popping it on both success and error.
    ///
    /// Returns the closure result together with the frame's final bindings.
    pub fn with_frame<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> crate::error::Result<T>,
    ) -> crate::error::Result<(T, IndexMap<String, TypedValue>)> {
        self.push_frame();
        let result = f(self);
        let frame = self.pop_frame();
        Ok((result?, frame))
    }

    /// Bind a value into the top frame.
    ///
    /// # Panics
    ///
    /// Panics if no frame is pushed.
    pub fn bind(&mut self, name: impl Into<String>, value: TypedValue) {
        let frame = self
            .frames
            .last_mut()
            .expect("bind without a pushed frame");
        frame.insert(name.into(), value);
    }

    /// Number of currently pushed frames.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Look a name up through the frames (top-down), then the arguments.
    ///
    /// The outer `Option` is a hit on the name; the inner one distinguishes a
    /// bound value from a recorded-missing argument.
    pub fn lookup(&self, name: &str) -> Option<Option<&TypedValue>> {
        for frame in self.frames.iter().rev() {
            if let Some(value) = frame.get(name) {
                return Some(Some(value));
            }
        }
        self.arguments.get(name).map(Option::as_ref)
    }

    /// Read an input argument directly, bypassing every derived frame.
    ///
    /// Residual computation uses this: it needs the original input, not a
    /// transformed shadow bound by an earlier output field.
    pub fn get_argument(&self, name: &str) -> Option<&TypedValue> {
        self.arguments.get(name).and_then(Option::as_ref)
    }

    pub fn resolve_field(&self, name: &str) -> Option<&'a DerivedField> {
        self.catalog.derived_field(name)
    }

    pub fn resolve_function(&self, name: &str) -> Option<&'a FunctionDef> {
        self.catalog.function(name)
    }

    pub fn catalog(&self) -> &'a dyn FieldCatalog {
        self.catalog
    }

    // =========================================================================
    // Warnings
    // =========================================================================

    /// Record a non-fatal diagnostic, surfaced via the WARNING output feature.
    pub fn record_warning(&mut self, text: impl Into<String>) {
        let text = text.into();
        log::debug!("evaluation warning: {text}");
        self.warnings.push(text);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;
    use crate::value::TypedValue;

    struct EmptyCatalog;

    impl FieldCatalog for EmptyCatalog {
        fn data_field(&self, _name: &str) -> Option<&FieldDecl> {
            None
        }

        fn derived_field(&self, _name: &str) -> Option<&DerivedField> {
            None
        }

        fn function(&self, _name: &str) -> Option<&FunctionDef> {
            None
        }
    }

    fn context_with(arguments: &[(&str, Option<TypedValue>)]) -> EvaluationContext<'static> {
        static CATALOG: EmptyCatalog = EmptyCatalog;
        let arguments = arguments
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        EvaluationContext::new(&CATALOG, arguments)
    }

    #[test]
    fn lookup_walks_frames_top_down() {
        let mut ctx = context_with(&[("x", Some(TypedValue::integer(1)))]);

        ctx.push_frame();
        ctx.bind("x", TypedValue::integer(2));
        ctx.push_frame();
        ctx.bind("x", TypedValue::integer(3));

        assert_eq!(ctx.lookup("x").unwrap().unwrap().as_integer().unwrap(), 3);

        ctx.pop_frame();
        assert_eq!(ctx.lookup("x").unwrap().unwrap().as_integer().unwrap(), 2);

        ctx.pop_frame();
        assert_eq!(ctx.lookup("x").unwrap().unwrap().as_integer().unwrap(), 1);
    }

    #[test]
    fn get_argument_bypasses_frames() {
        let mut ctx = context_with(&[("x", Some(TypedValue::integer(1)))]);

        ctx.push_frame();
        ctx.bind("x", TypedValue::integer(99));

        // The shadow is visible to lookup but never to get_argument.
        assert_eq!(ctx.lookup("x").unwrap().unwrap().as_integer().unwrap(), 99);
        assert_eq!(ctx.get_argument("x").unwrap().as_integer().unwrap(), 1);

        ctx.pop_frame();
    }

    #[test]
    fn missing_argument_is_a_hit_with_no_value() {
        let ctx = context_with(&[("x", None)]);
        assert_eq!(ctx.lookup("x"), Some(None));
        assert_eq!(ctx.lookup("y"), None);
    }

    #[test]
    fn with_frame_pops_on_error() {
        let mut ctx = context_with(&[]);

        let result: crate::error::Result<_> = ctx.with_frame(|ctx| {
            ctx.bind("tmp", TypedValue::integer(1));
            Err::<(), _>(EvalError::Evaluation("boom".into()))
        });

        assert!(result.is_err());
        assert_eq!(ctx.depth(), 0);
        assert!(ctx.lookup("tmp").is_none());
    }

    #[test]
    fn with_frame_returns_bindings() {
        let mut ctx = context_with(&[]);

        let ((), frame) = ctx
            .with_frame(|ctx| {
                ctx.bind("a", TypedValue::integer(1));
                ctx.bind("b", TypedValue::integer(2));
                Ok(())
            })
            .unwrap();

        assert_eq!(frame.len(), 2);
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    #[should_panic(expected = "pop_frame without matching push_frame")]
    fn unbalanced_pop_panics() {
        let mut ctx = context_with(&[]);
        ctx.pop_frame();
    }

    #[test]
    fn warnings_accumulate() {
        let mut ctx = context_with(&[]);
        ctx.record_warning("first");
        ctx.record_warning("second");
        assert_eq!(ctx.warnings(), &["first", "second"]);
    }
}
