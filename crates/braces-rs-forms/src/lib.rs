//! # braces-rs-forms
//!
//! The form side of the list+create workflows: the async [`Form`] trait, the
//! general-purpose [`BaseForm`], the [`FormKwargs`] assembled during the
//! `form_kwargs` hook phase, and the per-request [`FormState`].

pub mod fields;
pub mod form;
pub mod kwargs;
pub mod state;
pub mod validation;

pub use fields::{FormFieldDef, FormFieldType};
pub use form::{BaseForm, FieldsFormClass, Form, FormClass};
pub use kwargs::FormKwargs;
pub use state::FormState;
