//! Paths emitted by the derive.

/// Path of `vc_binding` from the crate being compiled, `::vc_binding` or
/// `::vc_persist::binding`.
///
/// Reading the manifest is not cheap, resolve once per derive.
pub(crate) fn vc_binding() -> syn::Path {
    vc_macro_utils::Manifest::shared(|manifest| manifest.crate_path("vc_binding"))
}
