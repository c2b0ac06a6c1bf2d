//! Certia Processing Library
//!
//! Synchronous, CPU-bound checks applied to uploads before anything touches
//! the network: category validation and PDF active-content sanitisation.

pub mod pdf;
pub mod validator;

pub use pdf::{
    check_has_form_fields, clean_embedded_files, clean_javascript, sanitise_pdf, PdfProfile,
    PdfSanitiseError,
};
pub use validator::{validate_file, validate_file_name};
