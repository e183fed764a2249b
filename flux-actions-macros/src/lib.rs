//! Procedural macros for flux-actions

use darling::{FromDeriveInput, FromField};
use proc_macro::TokenStream;
use quote::{format_ident, quote};
use std::collections::HashSet;
use syn::{parse_macro_input, DeriveInput};

/// Container for #[derive(ActionSet)]
#[derive(Debug, FromDeriveInput)]
#[darling(supports(struct_named))]
struct ActionSetOpts {
    ident: syn::Ident,
    generics: syn::Generics,
    data: darling::ast::Data<(), ActionField>,
}

/// Field-level attributes
#[derive(Debug, FromField)]
#[darling(attributes(action))]
struct ActionField {
    ident: Option<syn::Ident>,

    /// Explicit action name (defaults to the lowerCamelCase field name)
    #[darling(default)]
    name: Option<String>,

    /// Comma-separated argument roles
    #[darling(default)]
    args: Option<String>,

    /// Log message template
    #[darling(default)]
    log: Option<String>,

    /// Function computing the log message from the arguments
    #[darling(default)]
    log_with: Option<syn::Path>,

    /// Infallible pre-dispatch hook
    #[darling(default)]
    hook: Option<syn::Path>,

    /// Fallible pre-dispatch hook
    #[darling(default)]
    try_hook: Option<syn::Path>,
}

/// Convert snake_case to lowerCamelCase
fn to_lower_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper_next = false;
    for ch in s.trim_start_matches('_').chars() {
        if ch == '_' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Split a comma-separated role list, dropping empty entries
fn split_roles(s: &str) -> Vec<String> {
    s.split(',')
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect()
}

/// Derive macro for the ActionSet trait
///
/// Each field must be an `ActionHandle<Args>`. The generated
/// `ActionSet::register` defines one action per field. It fails without
/// defining anything if a name is taken or any field's roles or log template
/// are invalid.
///
/// Field attributes (all optional):
/// - `name = "..."` - action name, defaults to the field name in lowerCamelCase
/// - `args = "a, b"` - argument roles
/// - `log = "..."` - log template using `{role}` placeholders
/// - `log_with = "path::to::fn"` - `fn(&Args) -> String` producing the log line
/// - `hook = "path"` / `try_hook = "path"` - extra pre-dispatch side effect
///
/// # Example
/// ```ignore
/// #[derive(ActionSet)]
/// struct DocumentActions {
///     #[action(args = "filter", log = "Filter changed to: {filter}.")]
///     filter_changed: ActionHandle<(String,)>,
///
///     #[action(name = "nsChanged", args = "namespace")]
///     namespace_changed: ActionHandle<(String,)>,
/// }
///
/// let actions = DocumentActions::register(&registry)?;
/// assert_eq!(actions.filter_changed.name(), "filterChanged");
/// ```
#[proc_macro_derive(ActionSet, attributes(action))]
pub fn derive_action_set(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let opts = match ActionSetOpts::from_derive_input(&input) {
        Ok(opts) => opts,
        Err(e) => return e.write_errors().into(),
    };

    let name = &opts.ident;
    let (impl_generics, ty_generics, where_clause) = opts.generics.split_for_impl();

    let fields = match &opts.data {
        darling::ast::Data::Struct(fields) => &fields.fields,
        _ => {
            return syn::Error::new_spanned(&input, "ActionSet can only be derived for structs")
                .to_compile_error()
                .into();
        }
    };

    let mut seen = HashSet::new();
    let mut action_names = Vec::new();
    let mut def_builds = Vec::new();
    let mut def_checks = Vec::new();
    let mut field_inits = Vec::new();
    let mut field_idents = Vec::new();

    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let action_name = field
            .name
            .clone()
            .unwrap_or_else(|| to_lower_camel_case(&ident.to_string()));

        if !seen.insert(action_name.clone()) {
            return syn::Error::new_spanned(
                ident,
                format!("duplicate action name `{}` in ActionSet", action_name),
            )
            .to_compile_error()
            .into();
        }
        if field.log.is_some() && field.log_with.is_some() {
            return syn::Error::new_spanned(ident, "`log` and `log_with` are mutually exclusive")
                .to_compile_error()
                .into();
        }
        if field.hook.is_some() && field.try_hook.is_some() {
            return syn::Error::new_spanned(ident, "`hook` and `try_hook` are mutually exclusive")
                .to_compile_error()
                .into();
        }

        // Explicit element type so an empty role list still infers
        let args = field.args.as_deref().map(|a| {
            let roles = split_roles(a);
            let count = roles.len();
            quote! { .args::<[&str; #count], &str>([#(#roles),*]) }
        });
        let log = field.log.as_ref().map(|t| quote! { .log(#t) });
        let log_with = field.log_with.as_ref().map(|p| quote! { .log_with(#p) });
        let hook = field.hook.as_ref().map(|p| quote! { .hook(#p) });
        let try_hook = field.try_hook.as_ref().map(|p| quote! { .try_hook(#p) });

        let def = format_ident!("__def_{}", ident);
        def_builds.push(quote! {
            let #def = ::flux_actions::ActionDef::new(#action_name)
                #args #log #log_with #hook #try_hook;
        });
        def_checks.push(quote! { #def.validate()?; });
        field_inits.push(quote! { #ident: registry.define(#def)? });
        field_idents.push(ident.clone());
        action_names.push(action_name);
    }

    let expanded = quote! {
        impl #impl_generics ::flux_actions::ActionSet for #name #ty_generics #where_clause {
            fn register(
                registry: &::flux_actions::ActionRegistry,
            ) -> ::core::result::Result<Self, ::flux_actions::ActionError> {
                // Every check runs before the first action is defined
                registry.check_available(&[#(#action_names),*])?;
                #(#def_builds)*
                #(#def_checks)*
                ::core::result::Result::Ok(Self {
                    #(#field_inits,)*
                })
            }

            fn specs(&self) -> ::std::vec::Vec<::flux_actions::ActionSpec> {
                ::std::vec![#(self.#field_idents.spec()),*]
            }
        }
    };

    TokenStream::from(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_lower_camel_case() {
        assert_eq!(to_lower_camel_case("filter_changed"), "filterChanged");
        assert_eq!(to_lower_camel_case("fetch_next_documents"), "fetchNextDocuments");
        assert_eq!(to_lower_camel_case("refresh"), "refresh");
        assert_eq!(to_lower_camel_case("_private_thing"), "privateThing");
        assert_eq!(to_lower_camel_case("double__under"), "doubleUnder");
    }

    #[test]
    fn test_split_roles() {
        assert_eq!(split_roles("id"), vec!["id"]);
        assert_eq!(split_roles(" namespace , page "), vec!["namespace", "page"]);
        assert!(split_roles("").is_empty());
    }
}
