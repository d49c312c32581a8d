//! `#[derive(Describe)]` for seedling.
//!
//! Supported inputs are structs with named fields (or no fields) and enums
//! whose variants are all units. Generated code refers to the `seedling`
//! facade crate by absolute path.

use proc_macro::TokenStream;

mod emit;
mod parse;

/// Derive `seedling::Describe`.
///
/// Field attributes, all inside `#[seedling(...)]`:
///
/// - `rename = "key"`: read the field from `key`
/// - `skip`: never read the field; it must have a default or be an `Option`
/// - `default`: use `Default::default()` when the key is absent
/// - `default = expr`: use `expr` when the key is absent
/// - `codec = Path`: decode and encode through a `ValueCodec` (built with `Default`,
///   unless a singleton of `Path` is registered)
/// - `shared_codec = Path`: use the registered singleton of `Path`
///
/// On unit enum variants, `rename = "name"` changes the accepted string.
///
/// ```ignore
/// #[derive(Describe)]
/// struct Language {
///     name: String,
///     #[seedling(default = 20)]
///     age: u32,
///     #[seedling(rename = "alias")]
///     first_name: String,
/// }
/// ```
#[proc_macro_derive(Describe, attributes(seedling))]
pub fn derive_describe(input: TokenStream) -> TokenStream {
    let input = proc_macro2::TokenStream::from(input);
    let output = match parse::parse_input(input) {
        Ok(item) => emit::emit(&item),
        Err(err) => err.to_compile_error(),
    };
    output.into()
}
