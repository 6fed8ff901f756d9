use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::spanned::Spanned;
use syn::{parse_macro_input, Attribute, ImplItem, ItemImpl, LitInt, LitStr, Meta, Type};

/// Turns an impl block into a route group.
///
/// Usage:
/// ```ignore
/// struct JobController;
///
/// #[controller(name = "api", prefix = "/api")]
/// impl JobController {
///     #[get("/job")]
///     async fn list() -> String {
///         "jobs".to_string()
///     }
///
///     #[post("/job")]
///     async fn create() -> String {
///         "created".to_string()
///     }
/// }
/// ```
///
/// Generates `goodtables_core::controller::Controller` for the type (the
/// group's router with paths relative to `prefix`) and a `<Type>Api` struct
/// deriving `utoipa::OpenApi` over the annotated methods.
#[proc_macro_attribute]
pub fn controller(args: TokenStream, input: TokenStream) -> TokenStream {
    let group_args = parse_macro_input!(args as ControllerArgs);
    let impl_block = parse_macro_input!(input as ItemImpl);
    let self_ty = &impl_block.self_ty;
    let struct_name = match &**self_ty {
        syn::Type::Path(type_path) => match type_path.path.segments.last() {
            Some(segment) => &segment.ident,
            None => {
                return syn::Error::new(impl_block.span(), "Expected a struct type")
                    .to_compile_error()
                    .into();
            }
        },
        _ => {
            return syn::Error::new(impl_block.span(), "Expected a struct type")
                .to_compile_error()
                .into();
        }
    };

    let group_name = group_args
        .name
        .unwrap_or_else(|| struct_name.to_string().to_lowercase());
    let group_prefix = group_args.prefix.unwrap_or_else(|| "/".to_string());

    let mut route_registrations = Vec::new();
    let mut openapi_path_functions = Vec::new();
    let mut openapi_path_names = Vec::new();
    let mut schema_types = Vec::new();

    for item in &impl_block.items {
        let ImplItem::Fn(method) = item else {
            continue;
        };
        let Some((method_name, path)) = extract_route_attr(&method.attrs) else {
            continue;
        };
        let fn_name = &method.sig.ident;

        let axum_method = format_ident!("{}", method_name);
        route_registrations.push(quote! {
            router = router.route(#path, axum::routing::#axum_method(#struct_name::#fn_name));
        });

        // utoipa needs a free function to hang `#[utoipa::path]` on, so each
        // route gets a documentation-only twin outside the impl block.
        let wrapper_name = format_ident!("__utoipa_path_{}", fn_name);
        let fn_vis = &method.vis;
        let fn_async = method.sig.asyncness;
        let fn_inputs = &method.sig.inputs;
        let fn_output = &method.sig.output;
        let fn_generics = &method.sig.generics;
        let fn_where_clause = &method.sig.generics.where_clause;

        let documented_path = join_paths(&group_prefix, &path);
        let path_lit = LitStr::new(&documented_path, method.span());
        let tag_lit = LitStr::new(&group_name, method.span());

        let response_attrs = extract_utoipa_response_attrs(&method.attrs);
        let path_attr_tokens = if response_attrs.is_empty() {
            quote! {
                #axum_method,
                path = #path_lit,
                tag = #tag_lit,
            }
        } else {
            quote! {
                #axum_method,
                path = #path_lit,
                tag = #tag_lit,
                responses(
                    #(#response_attrs),*
                ),
            }
        };

        let handler_doc = format!("Documentation twin of `{struct_name}::{fn_name}`; never called.");
        openapi_path_functions.push(quote! {
            #[doc = #handler_doc]
            #[allow(dead_code, unused_variables)]
            #[utoipa::path(
                #path_attr_tokens
            )]
            #fn_vis #fn_async fn #wrapper_name #fn_generics(#fn_inputs) #fn_output #fn_where_clause {
                unreachable!()
            }
        });

        openapi_path_names.push(wrapper_name);
        schema_types.extend(extract_response_schema_types(&method.attrs));
    }

    let mut unique_schemas = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for schema_type in schema_types {
        if seen.insert(quote!(#schema_type).to_string()) {
            unique_schemas.push(schema_type);
        }
    }

    let api_struct_name = format_ident!("{}Api", struct_name);
    let openapi_attr = if unique_schemas.is_empty() {
        quote! {
            #[derive(utoipa::OpenApi)]
            #[openapi(
                paths(
                    #(#openapi_path_names),*
                )
            )]
        }
    } else {
        quote! {
            #[derive(utoipa::OpenApi)]
            #[openapi(
                paths(
                    #(#openapi_path_names),*
                ),
                components(schemas(
                    #(#unique_schemas),*
                ))
            )]
        }
    };

    let expanded = quote! {
        #impl_block

        impl goodtables_core::controller::Controller for #self_ty {
            const NAME: &'static str = #group_name;
            const PREFIX: &'static str = #group_prefix;

            fn router() -> axum::Router {
                let mut router = axum::Router::new();

                #(#route_registrations)*

                router
            }
        }

        #(#openapi_path_functions)*

        #openapi_attr
        pub struct #api_struct_name;
    };

    TokenStream::from(expanded)
}

fn join_paths(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{prefix}{path}")
    } else {
        format!("{prefix}/{path}")
    }
}

/// `name = "..."` and `prefix = "..."`, both optional.
#[derive(Default)]
struct ControllerArgs {
    name: Option<String>,
    prefix: Option<String>,
}

impl syn::parse::Parse for ControllerArgs {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let mut args = ControllerArgs::default();

        while !input.is_empty() {
            let key: syn::Ident = input.parse()?;
            let _eq: syn::Token![=] = input.parse()?;
            let value: LitStr = input.parse()?;

            match key.to_string().as_str() {
                "name" => args.name = Some(value.value()),
                "prefix" => {
                    let prefix = value.value();
                    if !prefix.starts_with('/') {
                        return Err(syn::Error::new(value.span(), "prefix must start with '/'"));
                    }
                    args.prefix = Some(prefix);
                }
                other => {
                    return Err(syn::Error::new(key.span(), format!("Unknown argument: {other}")));
                }
            }

            if !input.is_empty() {
                let _comma: syn::Token![,] = input.parse()?;
            }
        }

        Ok(args)
    }
}

/// Finds `#[get("/path")]` style attributes, with or without a crate path.
fn extract_route_attr(attrs: &[Attribute]) -> Option<(String, String)> {
    for attr in attrs {
        let Some(last_segment) = attr.path().segments.last() else {
            continue;
        };
        let method = last_segment.ident.to_string().to_lowercase();
        if matches!(method.as_str(), "get" | "post" | "put" | "delete" | "patch") {
            if let Meta::List(meta) = &attr.meta {
                if let Ok(path_lit) = syn::parse2::<LitStr>(meta.tokens.clone()) {
                    return Some((method, path_lit.value()));
                }
            }
        }
    }
    None
}

fn utoipa_response_tokens(attrs: &[Attribute]) -> impl Iterator<Item = proc_macro2::TokenStream> + '_ {
    attrs.iter().filter_map(|attr| {
        let last_segment = attr.path().segments.last()?;
        if last_segment.ident != "utoipa_response" {
            return None;
        }
        match &attr.meta {
            Meta::List(meta) => Some(meta.tokens.clone()),
            _ => None,
        }
    })
}

/// Response entries for `#[utoipa::path(responses(...))]`.
///
/// - `#[utoipa_response(Type)]`: status 200 with `Type` as body
/// - `#[utoipa_response(response = Type)]`: `Type` implements `IntoResponses`
/// - `#[utoipa_response(status = 404, body = Type, description = "...")]`
fn extract_utoipa_response_attrs(attrs: &[Attribute]) -> Vec<proc_macro2::TokenStream> {
    let mut responses = Vec::new();

    for tokens in utoipa_response_tokens(attrs) {
        if let Ok(parsed) = syn::parse2::<UtoipaResponseArgs>(tokens.clone()) {
            if let Some(response_type) = parsed.response {
                responses.push(quote! { #response_type });
                continue;
            }

            if let Some(body_type) = parsed.body {
                let status = parsed.status.unwrap_or(200);
                let description = parsed.description.as_deref().unwrap_or("Success");
                responses.push(quote! {
                    (status = #status, description = #description, body = #body_type)
                });
                continue;
            }

            if let Some(status) = parsed.status {
                let description = parsed.description.as_deref().unwrap_or("");
                responses.push(quote! {
                    (status = #status, description = #description)
                });
                continue;
            }
        }

        if let Ok(response_type) = syn::parse2::<Type>(tokens) {
            responses.push(quote! {
                (status = 200, description = "Success", body = #response_type)
            });
        }
    }

    responses
}

/// Types that belong in `components(schemas(...))`.
fn extract_response_schema_types(attrs: &[Attribute]) -> Vec<Type> {
    let mut schema_types = Vec::new();

    for tokens in utoipa_response_tokens(attrs) {
        if let Ok(parsed) = syn::parse2::<UtoipaResponseArgs>(tokens.clone()) {
            if let Some(body_type) = parsed.body {
                push_schema(body_type, &mut schema_types);
            }
            if let Some(response_type) = parsed.response {
                extract_types_from_generic(&response_type, &mut schema_types);
            }
            continue;
        }

        if let Ok(response_type) = syn::parse2::<Type>(tokens) {
            push_schema(response_type, &mut schema_types);
        }
    }

    schema_types
}

/// `Vec<T>` bodies register `T`; the container itself is not a schema.
fn push_schema(ty: Type, schema_types: &mut Vec<Type>) {
    if let Type::Path(type_path) = &ty {
        if let Some(segment) = type_path.path.segments.last() {
            if segment.ident == "Vec" {
                extract_types_from_generic(&ty, schema_types);
                return;
            }
        }
    }
    schema_types.push(ty);
}

/// Collects the type arguments of a generic type, recursively.
fn extract_types_from_generic(ty: &Type, schema_types: &mut Vec<Type>) {
    let Type::Path(type_path) = ty else {
        return;
    };
    let Some(path_segment) = type_path.path.segments.last() else {
        return;
    };
    let syn::PathArguments::AngleBracketed(args) = &path_segment.arguments else {
        return;
    };
    for arg in &args.args {
        if let syn::GenericArgument::Type(ty) = arg {
            extract_types_from_generic(ty, schema_types);
            schema_types.push(ty.clone());
        }
    }
}

#[derive(Debug)]
struct UtoipaResponseArgs {
    status: Option<u16>,
    body: Option<Type>,
    response: Option<Type>,
    description: Option<String>,
}

impl syn::parse::Parse for UtoipaResponseArgs {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let mut status = None;
        let mut body = None;
        let mut response = None;
        let mut description = None;

        while !input.is_empty() {
            let key: syn::Ident = input.parse()?;
            let _eq: syn::Token![=] = input.parse()?;

            match key.to_string().as_str() {
                "status" => {
                    let lit: LitInt = input.parse()?;
                    status = Some(lit.base10_parse::<u16>()?);
                }
                "body" => body = Some(input.parse()?),
                "response" => response = Some(input.parse()?),
                "description" => {
                    let lit: LitStr = input.parse()?;
                    description = Some(lit.value());
                }
                other => {
                    return Err(syn::Error::new(key.span(), format!("Unknown argument: {other}")));
                }
            }

            if !input.is_empty() {
                let _comma: syn::Token![,] = input.parse()?;
            }
        }

        if body.is_some() && response.is_some() {
            return Err(input.error("Cannot specify both 'body' and 'response'. Use 'body' for simple types or 'response' for IntoResponses types."));
        }

        Ok(UtoipaResponseArgs {
            status,
            body,
            response,
            description,
        })
    }
}

#[proc_macro_attribute]
pub fn get(_args: TokenStream, input: TokenStream) -> TokenStream {
    input
}

#[proc_macro_attribute]
pub fn post(_args: TokenStream, input: TokenStream) -> TokenStream {
    input
}

#[proc_macro_attribute]
pub fn put(_args: TokenStream, input: TokenStream) -> TokenStream {
    input
}

#[proc_macro_attribute]
pub fn delete(_args: TokenStream, input: TokenStream) -> TokenStream {
    input
}

#[proc_macro_attribute]
pub fn patch(_args: TokenStream, input: TokenStream) -> TokenStream {
    input
}

/// Response documentation for a route; read by `#[controller]`, otherwise a
/// no-op. Repeat it for each status code.
#[proc_macro_attribute]
pub fn utoipa_response(_args: TokenStream, input: TokenStream) -> TokenStream {
    input
}
