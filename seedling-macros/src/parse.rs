//! Parsing of `#[derive(Describe)]` input.
//!
//! The item header (attributes, visibility, keyword, name) goes through an
//! unsynn grammar. Bodies are split by hand because field types may contain
//! top-level commas inside angle brackets.

use proc_macro2::{Delimiter, Group, Literal, Span, Spacing, TokenStream as TokenStream2};
use quote::quote_spanned;
use unsynn::*;

keyword! {
    KStruct = "struct";
    KEnum = "enum";
    KPub = "pub";
}

unsynn! {
    /// Visibility: `pub`, `pub(...)` or nothing
    enum Vis {
        PubIn(Cons<KPub, ParenthesisGroup>),
        Pub(KPub),
    }

    /// An attribute: `#[...]`
    struct Attribute {
        _pound: Pound,
        content: BracketGroup,
    }

    /// The derive input, header only
    enum DeriveInput {
        Struct(StructItem),
        Enum(EnumItem),
    }

    struct StructItem {
        attrs: Vec<Attribute>,
        _vis: Option<Vis>,
        _kw: KStruct,
        name: Ident,
        rest: Vec<TokenTree>,
    }

    struct EnumItem {
        attrs: Vec<Attribute>,
        _vis: Option<Vis>,
        _kw: KEnum,
        name: Ident,
        rest: Vec<TokenTree>,
    }
}

/// A problem with the input, reported as a spanned `compile_error!`.
pub struct DeriveError {
    message: String,
    span: Span,
}

impl DeriveError {
    fn new(span: Span, message: impl Into<String>) -> Self {
        DeriveError {
            message: message.into(),
            span,
        }
    }

    pub fn to_compile_error(&self) -> TokenStream2 {
        let message = &self.message;
        quote_spanned! { self.span => compile_error!(#message); }
    }
}

pub struct Item {
    pub name: Ident,
    pub body: Body,
}

pub enum Body {
    Struct(Vec<Field>),
    Enum(Vec<Variant>),
}

pub struct Field {
    pub name: Ident,
    pub ty: TokenStream2,
    pub attrs: FieldAttrs,
}

impl Field {
    /// Declared name as written in input, without a raw-identifier prefix.
    pub fn key(&self) -> String {
        unraw(&self.name)
    }
}

#[derive(Default)]
pub struct FieldAttrs {
    pub rename: Option<Literal>,
    pub skip: bool,
    pub default: Option<DefaultAttr>,
    pub codec: Option<CodecAttr>,
    /// `deserialize_as = Type`: the concrete type read from input
    pub deserialize_as: Option<TokenStream2>,
}

pub enum DefaultAttr {
    /// `default`
    Trait,
    /// `default = expr`
    Expr(TokenStream2),
}

pub enum CodecAttr {
    /// `codec = Path`
    Owned(TokenStream2),
    /// `shared_codec = Path`
    Shared(TokenStream2),
}

pub struct Variant {
    pub name: Ident,
    pub rename: Option<Literal>,
}

impl Variant {
    pub fn key(&self) -> String {
        unraw(&self.name)
    }
}

const FIELD_ATTRS: &[&str] = &[
    "rename",
    "skip",
    "default",
    "codec",
    "shared_codec",
    "deserialize_as",
];
const VARIANT_ATTRS: &[&str] = &["rename"];

pub fn parse_input(input: TokenStream2) -> std::result::Result<Item, DeriveError> {
    let mut iter = input.to_token_iter();
    let parsed: DeriveInput = iter
        .parse()
        .map_err(|err| DeriveError::new(Span::call_site(), err.to_string()))?;

    match parsed {
        DeriveInput::Struct(item) => {
            reject_container_attrs(&item.attrs)?;
            let fields = struct_fields(&item.name, &item.rest)?;
            Ok(Item {
                name: item.name,
                body: Body::Struct(fields),
            })
        }
        DeriveInput::Enum(item) => {
            reject_container_attrs(&item.attrs)?;
            let variants = enum_variants(&item.name, &item.rest)?;
            Ok(Item {
                name: item.name,
                body: Body::Enum(variants),
            })
        }
    }
}

fn reject_container_attrs(attrs: &[Attribute]) -> std::result::Result<(), DeriveError> {
    for attr in attrs {
        let group = &attr.content.0;
        if seedling_args(group).is_some() {
            return Err(DeriveError::new(
                group.span(),
                "#[seedling(...)] is only allowed on fields and enum variants",
            ));
        }
    }
    Ok(())
}

fn struct_fields(name: &Ident, rest: &[TokenTree]) -> std::result::Result<Vec<Field>, DeriveError> {
    match rest.first() {
        Some(TokenTree::Group(group)) if group.delimiter() == Delimiter::Brace => {
            split_top_level(group.stream())
                .into_iter()
                .map(|tokens| parse_field(&tokens))
                .collect()
        }
        Some(TokenTree::Punct(p)) if p.as_char() == ';' => Ok(Vec::new()),
        Some(TokenTree::Punct(p)) if p.as_char() == '<' => Err(DeriveError::new(
            p.span(),
            "#[derive(Describe)] does not support generic types",
        )),
        Some(TokenTree::Group(group)) if group.delimiter() == Delimiter::Parenthesis => {
            Err(DeriveError::new(
                group.span(),
                "#[derive(Describe)] needs named fields; tuple structs are not supported",
            ))
        }
        Some(other) => Err(DeriveError::new(other.span(), "expected a struct body")),
        None => Err(DeriveError::new(name.span(), "expected a struct body")),
    }
}

fn enum_variants(name: &Ident, rest: &[TokenTree]) -> std::result::Result<Vec<Variant>, DeriveError> {
    let body = match rest.first() {
        Some(TokenTree::Group(group)) if group.delimiter() == Delimiter::Brace => group,
        Some(TokenTree::Punct(p)) if p.as_char() == '<' => {
            return Err(DeriveError::new(
                p.span(),
                "#[derive(Describe)] does not support generic types",
            ));
        }
        Some(other) => return Err(DeriveError::new(other.span(), "expected an enum body")),
        None => return Err(DeriveError::new(name.span(), "expected an enum body")),
    };

    let variants = split_top_level(body.stream())
        .into_iter()
        .map(|tokens| parse_variant(&tokens))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if variants.is_empty() {
        return Err(DeriveError::new(
            name.span(),
            "#[derive(Describe)] needs at least one variant",
        ));
    }
    Ok(variants)
}

fn parse_field(tokens: &[TokenTree]) -> std::result::Result<Field, DeriveError> {
    let (attr_groups, rest) = take_attrs(tokens);
    let rest = skip_vis(rest);

    let (name, rest) = match rest.split_first() {
        Some((TokenTree::Ident(name), rest)) => (name.clone(), rest),
        Some((other, _)) => return Err(DeriveError::new(other.span(), "expected a field name")),
        None => return Err(DeriveError::new(Span::call_site(), "expected a field name")),
    };
    let ty = match rest.split_first() {
        Some((TokenTree::Punct(colon), ty)) if colon.as_char() == ':' && !ty.is_empty() => {
            ty.iter().cloned().collect::<TokenStream2>()
        }
        _ => return Err(DeriveError::new(name.span(), "expected `: Type` after the field name")),
    };

    let mut attrs = FieldAttrs::default();
    for group in &attr_groups {
        let Some(args) = seedling_args(group) else {
            continue;
        };
        for item in attr_items(group.span(), args, FIELD_ATTRS)? {
            let duplicate = match item.key.as_str() {
                "rename" => attrs.rename.replace(item.string_literal()?).is_some(),
                "skip" => {
                    item.expect_flag()?;
                    std::mem::replace(&mut attrs.skip, true)
                }
                "default" => {
                    let default = match item.value {
                        Some(_) => DefaultAttr::Expr(item.expr()?),
                        None => DefaultAttr::Trait,
                    };
                    attrs.default.replace(default).is_some()
                }
                "codec" => attrs.codec.replace(CodecAttr::Owned(item.expr()?)).is_some(),
                "shared_codec" => attrs.codec.replace(CodecAttr::Shared(item.expr()?)).is_some(),
                "deserialize_as" => attrs.deserialize_as.replace(item.expr()?).is_some(),
                other => return Err(unknown_attr(other, item.span, FIELD_ATTRS)),
            };
            if duplicate {
                return Err(DeriveError::new(
                    item.span,
                    format!("`{}` is given more than once for field `{}`", item.key, name),
                ));
            }
        }
    }

    if attrs.codec.is_some() && attrs.deserialize_as.is_some() {
        return Err(DeriveError::new(
            name.span(),
            format!("field `{name}` has both a codec and `deserialize_as`; use one"),
        ));
    }

    Ok(Field { name, ty, attrs })
}

fn parse_variant(tokens: &[TokenTree]) -> std::result::Result<Variant, DeriveError> {
    let (attr_groups, rest) = take_attrs(tokens);
    let (name, rest) = match rest.split_first() {
        Some((TokenTree::Ident(name), rest)) => (name.clone(), rest),
        Some((other, _)) => return Err(DeriveError::new(other.span(), "expected a variant name")),
        None => return Err(DeriveError::new(Span::call_site(), "expected a variant name")),
    };
    match rest.first() {
        None => {}
        Some(TokenTree::Punct(eq)) if eq.as_char() == '=' => {}
        Some(other) => {
            return Err(DeriveError::new(
                other.span(),
                format!("#[derive(Describe)] only supports unit variants; `{name}` carries data"),
            ));
        }
    }

    let mut rename = None;
    for group in &attr_groups {
        let Some(args) = seedling_args(group) else {
            continue;
        };
        for item in attr_items(group.span(), args, VARIANT_ATTRS)? {
            if rename.replace(item.string_literal()?).is_some() {
                return Err(DeriveError::new(
                    item.span,
                    format!("`rename` is given more than once for variant `{name}`"),
                ));
            }
        }
    }

    Ok(Variant { name, rename })
}

/// Leading `#[...]` attributes and the tokens after them.
fn take_attrs(tokens: &[TokenTree]) -> (Vec<Group>, &[TokenTree]) {
    let mut groups = Vec::new();
    let mut rest = tokens;
    while let [TokenTree::Punct(pound), TokenTree::Group(group), tail @ ..] = rest {
        if pound.as_char() != '#' || group.delimiter() != Delimiter::Bracket {
            break;
        }
        groups.push(group.clone());
        rest = tail;
    }
    (groups, rest)
}

fn skip_vis(tokens: &[TokenTree]) -> &[TokenTree] {
    match tokens {
        [TokenTree::Ident(kw), TokenTree::Group(group), rest @ ..]
            if kw == "pub" && group.delimiter() == Delimiter::Parenthesis =>
        {
            rest
        }
        [TokenTree::Ident(kw), rest @ ..] if kw == "pub" => rest,
        _ => tokens,
    }
}

/// The argument stream of a `seedling(...)` attribute body.
fn seedling_args(attr: &Group) -> Option<TokenStream2> {
    let mut tokens = attr.stream().into_iter();
    match (tokens.next(), tokens.next()) {
        (Some(TokenTree::Ident(ident)), Some(TokenTree::Group(args)))
            if ident == "seedling" && args.delimiter() == Delimiter::Parenthesis =>
        {
            Some(args.stream())
        }
        _ => None,
    }
}

struct AttrItem {
    key: String,
    span: Span,
    value: Option<Vec<TokenTree>>,
}

impl AttrItem {
    fn expect_flag(&self) -> std::result::Result<(), DeriveError> {
        match self.value {
            None => Ok(()),
            Some(_) => Err(DeriveError::new(
                self.span,
                format!("`{}` does not take a value", self.key),
            )),
        }
    }

    fn expr(&self) -> std::result::Result<TokenStream2, DeriveError> {
        match &self.value {
            Some(tokens) if !tokens.is_empty() => Ok(tokens.iter().cloned().collect()),
            _ => Err(DeriveError::new(
                self.span,
                format!("`{}` needs a value: `{} = ...`", self.key, self.key),
            )),
        }
    }

    fn string_literal(&self) -> std::result::Result<Literal, DeriveError> {
        match self.value.as_deref() {
            Some([TokenTree::Literal(lit)]) if lit.to_string().starts_with('"') => Ok(lit.clone()),
            _ => Err(DeriveError::new(
                self.span,
                format!("`{}` needs a string: `{} = \"...\"`", self.key, self.key),
            )),
        }
    }
}

fn attr_items(
    span: Span,
    args: TokenStream2,
    known: &[&str],
) -> std::result::Result<Vec<AttrItem>, DeriveError> {
    let mut items = Vec::new();
    for tokens in split_top_level(args) {
        let (key, span) = match tokens.first() {
            Some(TokenTree::Ident(ident)) => (ident.to_string(), ident.span()),
            Some(other) => return Err(DeriveError::new(other.span(), "expected an attribute name")),
            None => return Err(DeriveError::new(span, "empty attribute")),
        };
        if !known.contains(&key.as_str()) {
            return Err(unknown_attr(&key, span, known));
        }
        let value = match tokens.get(1) {
            None => None,
            Some(TokenTree::Punct(eq)) if eq.as_char() == '=' => Some(tokens[2..].to_vec()),
            Some(other) => {
                return Err(DeriveError::new(
                    other.span(),
                    format!("expected `=` or `,` after `{key}`"),
                ));
            }
        };
        items.push(AttrItem { key, span, value });
    }
    Ok(items)
}

fn unknown_attr(got: &str, span: Span, known: &[&str]) -> DeriveError {
    let mut best: Option<(&str, f64)> = None;
    for candidate in known {
        let score = strsim::jaro_winkler(got, candidate);
        if score > 0.7 && best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((candidate, score));
        }
    }
    let message = match best {
        Some((suggestion, _)) => format!(
            "unknown seedling attribute `{got}`, did you mean `{suggestion}`?\navailable attributes: {}",
            known.join(", ")
        ),
        None => format!(
            "unknown seedling attribute `{got}`\navailable attributes: {}",
            known.join(", ")
        ),
    };
    DeriveError::new(span, message)
}

/// Split on commas that are not nested in groups or angle brackets.
fn split_top_level(stream: TokenStream2) -> Vec<Vec<TokenTree>> {
    let mut parts = Vec::new();
    let mut current = Vec::new();
    let mut depth = 0usize;
    let mut after_dash = false;

    for tt in stream {
        if let TokenTree::Punct(p) = &tt {
            match p.as_char() {
                '<' => depth += 1,
                // `->` in fn pointer types
                '>' if !after_dash => depth = depth.saturating_sub(1),
                ',' if depth == 0 => {
                    parts.push(std::mem::take(&mut current));
                    after_dash = false;
                    continue;
                }
                _ => {}
            }
            after_dash = p.as_char() == '-' && p.spacing() == Spacing::Joint;
        } else {
            after_dash = false;
        }
        current.push(tt);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

fn unraw(ident: &Ident) -> String {
    let name = ident.to_string();
    match name.strip_prefix("r#") {
        Some(stripped) => stripped.to_owned(),
        None => name,
    }
}
