use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    meta::ParseNestedMeta, parenthesized, parse_macro_input, spanned::Spanned, token,
    Attribute, Data, DeriveInput, Expr, Fields, GenericArgument, LitStr, PathArguments,
    PathSegment, Token, Type,
};

/// Derive `brrtbind::schema::Schema` for a struct with named fields.
///
/// The generated JSON Schema describes every non-skipped field under the name serde
/// deserializes it from, so `rename`, `rename_all` and `alias` are honoured. Serde
/// attributes that change the object's shape (`flatten`, `untagged`, `from`, ...) are
/// rejected at compile time. Field constraints are declared with `#[schema(...)]`:
///
/// ```rust,ignore
/// #[derive(Serialize, Deserialize, Schema)]
/// struct UserInfoModel {
///     #[schema(minimum = 1, title = "user id")]
///     user_id: i64,
///     #[serde(default)]
///     tags: Vec<String>,
/// }
/// ```
#[proc_macro_derive(Schema, attributes(schema))]
pub fn derive_schema(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(ts) => ts.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let sj = serde_json_path();
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new(
                    input.span(),
                    "Schema can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new(
                input.span(),
                "Schema can only be derived for structs",
            ))
        }
    };

    let container = SerdeFlags::from_attrs(&input.attrs)?;
    let mut inserts = Vec::new();
    let mut required = Vec::new();
    // Required fields that may arrive under an alias: any one of the names satisfies them.
    let mut required_any = Vec::new();

    for field in fields {
        let serde = SerdeFlags::from_attrs(&field.attrs)?;
        if serde.skip {
            continue;
        }
        let name = match (serde.rename, &field.ident) {
            (Some(n), _) => n,
            (None, Some(i)) => {
                let raw = i.to_string();
                let raw = raw.trim_start_matches("r#");
                match container.rename_all {
                    Some(rule) => rule.apply_to_field(raw),
                    None => raw.to_string(),
                }
            }
            (None, None) => continue,
        };
        let constraints = constraints_from_attrs(&field.attrs)?;
        let (schema_expr, optional) = type_schema(&field.ty);
        let schema_expr = if serde.custom_deserialize {
            quote!(#sj::json!({}))
        } else {
            schema_expr
        };
        let mut names = vec![name];
        names.extend(serde.aliases);
        if !optional && !serde.default && !container.default {
            if names.len() == 1 {
                required.push(names[0].clone());
            } else {
                required_any.push(names.clone());
            }
        }

        let constraint_block = if constraints.is_empty() {
            quote! {}
        } else {
            let sets = constraints.iter().map(|(key, expr)| {
                quote! { obj.insert(#key.to_string(), #sj::Value::from(#expr)); }
            });
            quote! {
                if let #sj::Value::Object(ref mut obj) = field_schema {
                    #(#sets)*
                }
            }
        };

        inserts.push(quote! {
            {
                #[allow(unused_mut)]
                let mut field_schema: #sj::Value = #schema_expr;
                #constraint_block
                #(properties.insert(#names.to_string(), field_schema.clone());)*
            }
        });
    }

    let title = LitStr::new(&ident.to_string(), ident.span());
    let required_values = required
        .iter()
        .map(|r| quote!(#sj::Value::String(#r.to_string())));
    let any_of = required_any.iter().map(|names| {
        quote!(#sj::json!({ "anyOf": [#({ "required": [#names] }),*] }))
    });
    let all_of = if required_any.is_empty() {
        quote! {}
    } else {
        quote! { schema.insert("allOf".to_string(), #sj::Value::Array(vec![#(#any_of),*])); }
    };
    let deny = if container.deny_unknown_fields {
        quote! { schema.insert("additionalProperties".to_string(), #sj::Value::Bool(false)); }
    } else {
        quote! {}
    };

    Ok(quote! {
        impl #impl_generics ::brrtbind::schema::Schema for #ident #ty_generics #where_clause {
            fn schema_name() -> &'static str {
                #title
            }

            fn json_schema() -> #sj::Value {
                let mut properties = #sj::Map::new();
                #(#inserts)*
                let mut schema = #sj::Map::new();
                schema.insert("title".to_string(), #sj::Value::String(#title.to_string()));
                schema.insert("type".to_string(), #sj::Value::String("object".to_string()));
                schema.insert("properties".to_string(), #sj::Value::Object(properties));
                schema.insert(
                    "required".to_string(),
                    #sj::Value::Array(vec![#(#required_values),*]),
                );
                #all_of
                #deny
                #sj::Value::Object(schema)
            }
        }
    })
}

fn serde_json_path() -> TokenStream2 {
    quote!(::brrtbind::__private::serde_json)
}

/// Map a Rust field type onto a JSON Schema expression. The flag reports whether the
/// type is `Option<_>`, which makes the field optional.
fn type_schema(ty: &Type) -> (TokenStream2, bool) {
    let sj = serde_json_path();
    match ty {
        Type::Reference(r) => type_schema(&r.elem),
        Type::Paren(p) => type_schema(&p.elem),
        Type::Group(g) => type_schema(&g.elem),
        Type::Path(p) if p.qself.is_none() => {
            let Some(seg) = p.path.segments.last() else {
                return (quote!(#sj::json!({})), false);
            };
            let name = seg.ident.to_string();
            match name.as_str() {
                "Option" => match nth_type_arg(seg, 0) {
                    Some(inner) => {
                        let (inner_ts, _) = type_schema(inner);
                        (
                            quote!(#sj::json!({ "anyOf": [(#inner_ts), { "type": "null" }] })),
                            true,
                        )
                    }
                    None => (quote!(#sj::json!({})), true),
                },
                "Vec" | "VecDeque" | "HashSet" | "BTreeSet" | "LinkedList" | "BinaryHeap" => {
                    match nth_type_arg(seg, 0) {
                        Some(inner) => {
                            let (inner_ts, _) = type_schema(inner);
                            (
                                quote!(#sj::json!({ "type": "array", "items": (#inner_ts) })),
                                false,
                            )
                        }
                        None => (quote!(#sj::json!({ "type": "array" })), false),
                    }
                }
                "HashMap" | "BTreeMap" | "IndexMap" => match nth_type_arg(seg, 1) {
                    Some(inner) => {
                        let (inner_ts, _) = type_schema(inner);
                        (
                            quote!(#sj::json!({
                                "type": "object",
                                "additionalProperties": (#inner_ts)
                            })),
                            false,
                        )
                    }
                    None => (quote!(#sj::json!({ "type": "object" })), false),
                },
                "Box" | "Rc" | "Arc" | "Cow" => match nth_type_arg(seg, 0) {
                    Some(inner) => type_schema(inner),
                    None => (quote!(#sj::json!({})), false),
                },
                "String" | "str" | "char" => (quote!(#sj::json!({ "type": "string" })), false),
                "i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32" | "u64"
                | "usize" => {
                    // Bounds let the validator report an out-of-range value at its path.
                    let prim = format_ident!("{}", name);
                    (
                        quote!(#sj::json!({
                            "type": "integer",
                            "minimum": ::core::primitive::#prim::MIN,
                            "maximum": ::core::primitive::#prim::MAX
                        })),
                        false,
                    )
                }
                "i128" => (quote!(#sj::json!({ "type": "integer" })), false),
                "u128" => (
                    quote!(#sj::json!({ "type": "integer", "minimum": 0 })),
                    false,
                ),
                "f32" | "f64" => (quote!(#sj::json!({ "type": "number" })), false),
                "bool" => (quote!(#sj::json!({ "type": "boolean" })), false),
                "Value" => (quote!(#sj::json!({})), false),
                _ => (
                    quote!(<#ty as ::brrtbind::schema::Schema>::json_schema()),
                    false,
                ),
            }
        }
        _ => (quote!(#sj::json!({})), false),
    }
}

fn nth_type_arg(seg: &PathSegment, n: usize) -> Option<&Type> {
    let PathArguments::AngleBracketed(args) = &seg.arguments else {
        return None;
    };
    args.args
        .iter()
        .filter_map(|a| match a {
            GenericArgument::Type(t) => Some(t),
            _ => None,
        })
        .nth(n)
}

#[derive(Default)]
struct SerdeFlags {
    default: bool,
    skip: bool,
    deny_unknown_fields: bool,
    custom_deserialize: bool,
    rename: Option<String>,
    rename_all: Option<RenameRule>,
    aliases: Vec<String>,
}

/// Serde keys that reshape the wire format in ways a flat object schema cannot describe.
const UNSUPPORTED_SERDE_KEYS: &[&str] = &[
    "flatten",
    "transparent",
    "tag",
    "content",
    "untagged",
    "from",
    "try_from",
];

impl SerdeFlags {
    /// Read the serde keys that change the deserialized shape. Keys that only affect
    /// serialization are consumed and ignored.
    fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut flags = SerdeFlags::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
            attr.parse_nested_meta(|meta| {
                let key = meta
                    .path
                    .get_ident()
                    .map(|i| i.to_string())
                    .unwrap_or_default();
                match key.as_str() {
                    "default" => {
                        flags.default = true;
                        skip_meta_value(&meta)?;
                    }
                    "skip" | "skip_deserializing" => flags.skip = true,
                    "deny_unknown_fields" => flags.deny_unknown_fields = true,
                    "with" | "deserialize_with" => {
                        flags.custom_deserialize = true;
                        skip_meta_value(&meta)?;
                    }
                    "alias" => {
                        let lit: LitStr = meta.value()?.parse()?;
                        flags.aliases.push(lit.value());
                    }
                    "rename" => {
                        if let Some(lit) = deserialize_name(&meta)? {
                            flags.rename = Some(lit.value());
                        }
                    }
                    "rename_all" => {
                        if let Some(lit) = deserialize_name(&meta)? {
                            let rule = RenameRule::parse(&lit.value())
                                .ok_or_else(|| syn::Error::new(lit.span(), format!(
                                    "unknown rename_all rule `{}`",
                                    lit.value()
                                )))?;
                            flags.rename_all = Some(rule);
                        }
                    }
                    k if UNSUPPORTED_SERDE_KEYS.contains(&k) => {
                        return Err(meta.error(format!(
                            "Schema derive cannot describe `#[serde({k})]`; implement Schema by hand"
                        )));
                    }
                    _ => skip_meta_value(&meta)?,
                }
                Ok(())
            })?;
        }
        Ok(flags)
    }
}

/// Accepts `key = "name"` or `key(serialize = "..", deserialize = "..")` and returns the
/// name that applies when deserializing, if any.
fn deserialize_name(meta: &ParseNestedMeta<'_>) -> syn::Result<Option<LitStr>> {
    if meta.input.peek(Token![=]) {
        return Ok(Some(meta.value()?.parse()?));
    }
    let mut name = None;
    meta.parse_nested_meta(|inner| {
        let lit: LitStr = inner.value()?.parse()?;
        if inner.path.is_ident("deserialize") {
            name = Some(lit);
        }
        Ok(())
    })?;
    Ok(name)
}

fn skip_meta_value(meta: &ParseNestedMeta<'_>) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        let _: Expr = meta.value()?.parse()?;
    } else if meta.input.peek(token::Paren) {
        let content;
        parenthesized!(content in meta.input);
        let _: TokenStream2 = content.parse()?;
    }
    Ok(())
}

/// Serde's `rename_all` casing rules as applied to snake_case field names.
#[derive(Clone, Copy)]
enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    fn parse(rule: &str) -> Option<Self> {
        Some(match rule {
            "lowercase" => Self::Lower,
            "UPPERCASE" => Self::Upper,
            "PascalCase" => Self::Pascal,
            "camelCase" => Self::Camel,
            "snake_case" => Self::Snake,
            "SCREAMING_SNAKE_CASE" => Self::ScreamingSnake,
            "kebab-case" => Self::Kebab,
            "SCREAMING-KEBAB-CASE" => Self::ScreamingKebab,
            _ => return None,
        })
    }

    fn apply_to_field(self, field: &str) -> String {
        match self {
            Self::Lower | Self::Snake => field.to_string(),
            Self::Upper | Self::ScreamingSnake => field.to_ascii_uppercase(),
            Self::Pascal => {
                let mut out = String::with_capacity(field.len());
                let mut capitalize = true;
                for ch in field.chars() {
                    if ch == '_' {
                        capitalize = true;
                    } else if capitalize {
                        out.push(ch.to_ascii_uppercase());
                        capitalize = false;
                    } else {
                        out.push(ch);
                    }
                }
                out
            }
            Self::Camel => {
                let pascal = Self::Pascal.apply_to_field(field);
                let mut chars = pascal.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
                    None => pascal,
                }
            }
            Self::Kebab => field.replace('_', "-"),
            Self::ScreamingKebab => field.to_ascii_uppercase().replace('_', "-"),
        }
    }
}

fn constraints_from_attrs(attrs: &[Attribute]) -> syn::Result<Vec<(&'static str, Expr)>> {
    let mut out = Vec::new();
    for attr in attrs.iter().filter(|a| a.path().is_ident("schema")) {
        attr.parse_nested_meta(|meta| {
            let key = meta
                .path
                .get_ident()
                .map(|i| i.to_string())
                .unwrap_or_default();
            let json_key = match key.as_str() {
                "minimum" => "minimum",
                "maximum" => "maximum",
                "min_length" => "minLength",
                "max_length" => "maxLength",
                "min_items" => "minItems",
                "max_items" => "maxItems",
                "pattern" => "pattern",
                "title" => "title",
                _ => return Err(meta.error(format!("unsupported schema constraint `{key}`"))),
            };
            let expr: Expr = meta.value()?.parse()?;
            out.push((json_key, expr));
            Ok(())
        })?;
    }
    Ok(out)
}
