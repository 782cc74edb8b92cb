//! JSON grammar
//!
//! [`JsonRules::install`] adds a JSON value grammar to a [`GrammarBuilder`].
//! The mutually recursive value, array and object rules are tied together
//! through a forward reference that is bound once every branch exists.
//!
//! Besides the generic rules, [`JsonRules`] builds strict matchers for
//! objects of a known shape: [`name_value_pair`](JsonRules::name_value_pair)
//! matches one member with a fixed name, and [`object`](JsonRules::object) /
//! [`object_any_order`](JsonRules::object_any_order) wrap member grammars in
//! braces.
//!
//! Strings are decoded in the tree: escape sequences are replaced by the
//! byte they denote. `\u` escapes are not supported.
//!
//! Tagged tokens distinguish the structured parts of a value:
//!
//! * [`TAG_OBJECT`] wraps the list of `(name value)` members
//! * [`TAG_ARRAY`] wraps the list of elements
//! * [`TAG_STRING`] wraps the decoded byte-string
//! * [`TAG_NUMBER`] wraps the literal text of a number
//!
//! `true`, `false` and `null` are plain byte-strings. See
//! [`value::JsonValue`] for a typed view of such a tree.

pub mod value;

use log::debug;

use crate::charset::CharSet;
use crate::error::{GrammarError, GrammarResult, LiteralKind};
use crate::grammar::{GrammarBuilder, Rule};
use crate::tree::{flatten, Arena, Tag, Token, TokenRef};

pub const TAG_OBJECT: Tag = Tag(1);
pub const TAG_ARRAY: Tag = Tag(2);
pub const TAG_STRING: Tag = Tag(3);
pub const TAG_NUMBER: Tag = Tag(4);

/// Anti-hijacking prefix sometimes prepended to JSON response bodies
pub const BODY_PREFIX: &[u8] = b")]}'\r\n";

const WHITESPACE: CharSet = CharSet::from_bytes(b" \r\n\t");
/// Bytes that may follow a backslash
const ESCAPES: CharSet = CharSet::from_bytes(b"\"\\/bfnrt");
/// Bytes that may appear unescaped inside a string
const UNESCAPED: CharSet = CharSet::from_bytes(b"\"\\")
    .union(CharSet::from_range(0x00, 0x1f))
    .complement();

/// Checks that `name` is legal string content, escapes included.
fn check_member_name(name: &[u8]) -> GrammarResult<()> {
    if name.is_empty() {
        return Err(GrammarError::invalid(LiteralKind::JsonName, name, 0));
    }
    let mut ix = 0;
    while ix < name.len() {
        match name[ix] {
            b'\\' => match name.get(ix + 1) {
                Some(&c) if ESCAPES.contains(c) => ix += 2,
                _ => return Err(GrammarError::invalid(LiteralKind::JsonName, name, ix)),
            },
            c if UNESCAPED.contains(c) => ix += 1,
            _ => return Err(GrammarError::invalid(LiteralKind::JsonName, name, ix)),
        }
    }
    Ok(())
}

/// Maps the byte following a backslash to the byte it stands for.
fn unescape(arena: &mut Arena, r: TokenRef) -> TokenRef {
    let c = match arena.get(r) {
        Token::Uint(c) => *c as u8,
        _ => return r,
    };
    let decoded = match c {
        b'b' => 0x08,
        b'f' => 0x0c,
        b'n' => b'\n',
        b'r' => b'\r',
        b't' => b'\t',
        other => other,
    };
    arena.alloc(Token::Uint(decoded as u64))
}

/// Suppressed `c` with any whitespace around it
fn structural(b: &mut GrammarBuilder, many_ws: Rule, c: u8) -> GrammarResult<Rule> {
    let ch = b.ch(c);
    let padded = b.sequence(&[many_ws, ch, many_ws])?;
    b.suppress(padded)
}

/// Handles of the installed JSON rules.
#[derive(Clone, Copy, Debug)]
pub struct JsonRules {
    /// One whitespace byte
    pub ws: Rule,
    pub quote: Rule,
    /// Suppressed `,` with surrounding whitespace
    pub comma: Rule,
    /// Suppressed `:` with surrounding whitespace
    pub colon: Rule,
    pub lit_true: Rule,
    pub lit_false: Rule,
    pub lit_null: Rule,
    pub any_number: Rule,
    /// One character of string content, escaped or not
    pub json_char: Rule,
    pub any_string: Rule,
    pub any_array: Rule,
    /// `string ":" value`
    pub any_pair: Rule,
    pub any_object: Rule,
    pub value: Rule,
    /// A value with optional surrounding whitespace
    pub document: Rule,
    /// The literal [`BODY_PREFIX`]
    pub prefix: Rule,
    open_quote: Rule,
    left_curly: Rule,
    right_curly: Rule,
}

impl JsonRules {
    pub fn install(b: &mut GrammarBuilder) -> GrammarResult<Self> {
        let ws = b.set(WHITESPACE);
        let many_ws = b.many(ws)?;
        let left_square = structural(b, many_ws, b'[')?;
        let right_square = structural(b, many_ws, b']')?;
        let left_curly = structural(b, many_ws, b'{')?;
        let right_curly = structural(b, many_ws, b'}')?;
        let colon = structural(b, many_ws, b':')?;
        let comma = structural(b, many_ws, b',')?;

        let lit_true = b.literal(b"true")?;
        let lit_false = b.literal(b"false")?;
        let lit_null = b.literal(b"null")?;

        let value = b.indirect();

        let minus = b.ch(b'-');
        let plus = b.ch(b'+');
        let dot = b.ch(b'.');
        let zero = b.ch(b'0');
        let digit = b.range(b'0', b'9')?;
        let non_zero = b.range(b'1', b'9')?;
        let exp = b.one_of(b"Ee");
        let opt_minus = b.optional(minus)?;
        let digits = b.many(digit)?;
        let digits1 = b.many1(digit)?;
        let nonzero_int = b.sequence(&[non_zero, digits])?;
        let int = b.choice(&[zero, nonzero_int])?;
        let frac = b.sequence(&[dot, digits1])?;
        let opt_frac = b.optional(frac)?;
        let sign = b.choice(&[plus, minus])?;
        let opt_sign = b.optional(sign)?;
        let exponent = b.sequence(&[exp, opt_sign, digits1])?;
        let opt_exponent = b.optional(exponent)?;
        let number = b.sequence(&[opt_minus, int, opt_frac, opt_exponent])?;
        let number_text = b.action(number, flatten)?;
        let any_number = b.tag(number_text, TAG_NUMBER)?;

        let quote = b.ch(b'"');
        let backslash = b.ch(b'\\');
        let escape_char = b.set(ESCAPES);
        let escape = b.right(backslash, escape_char)?;
        let escaped = b.action(escape, unescape)?;
        let unescaped = b.set(UNESCAPED);
        let json_char = b.choice(&[escaped, unescaped])?;
        let chars = b.many(json_char)?;
        let quoted = b.middle(quote, chars, quote)?;
        let string_text = b.action(quoted, flatten)?;
        let any_string = b.tag(string_text, TAG_STRING)?;

        let elements = b.sep_by(value, comma)?;
        let array = b.middle(left_square, elements, right_square)?;
        let any_array = b.tag(array, TAG_ARRAY)?;

        let any_pair = b.sequence(&[any_string, colon, value])?;
        let members = b.sep_by(any_pair, comma)?;
        let object = b.middle(left_curly, members, right_curly)?;
        let any_object = b.tag(object, TAG_OBJECT)?;

        let branches = b.choice(&[
            any_object, any_array, any_number, any_string, lit_true, lit_false, lit_null,
        ])?;
        b.bind(value, branches)?;

        let document = b.middle(many_ws, value, many_ws)?;
        let prefix = b.literal(BODY_PREFIX)?;
        let open_quote = b.suppress(quote)?;

        debug!("installed JSON rules");
        Ok(Self {
            ws,
            quote,
            comma,
            colon,
            lit_true,
            lit_false,
            lit_null,
            any_number,
            json_char,
            any_string,
            any_array,
            any_pair,
            any_object,
            value,
            document,
            prefix,
            open_quote,
            left_curly,
            right_curly,
        })
    }

    /// Matches `"name": value` where the member name is exactly `name`,
    /// producing `(name value)`.
    ///
    /// `name` is compared byte for byte against the raw input, escapes
    /// included, and must itself be legal string content.
    pub fn name_value_pair(
        &self,
        b: &mut GrammarBuilder,
        name: &[u8],
        value: Rule,
    ) -> GrammarResult<Rule> {
        check_member_name(name)?;
        let name = b.literal(name)?;
        b.sequence(&[self.open_quote, name, self.open_quote, self.colon, value])
    }

    /// Wraps `members` in braces, producing the token of `members`.
    ///
    /// Separators are the business of `members`. When it is a plain
    /// [`permutation`](GrammarBuilder::permutation) with explicit commas, the
    /// commas are permuted too, so misplaced commas are accepted; use
    /// [`object_any_order`](Self::object_any_order) for strict separators.
    pub fn object(&self, b: &mut GrammarBuilder, members: Rule) -> GrammarResult<Rule> {
        b.middle(self.left_curly, members, self.right_curly)
    }

    /// An object holding exactly `members`, in any order, separated by commas.
    ///
    /// Member tokens are listed in the order of `members`.
    pub fn object_any_order(&self, b: &mut GrammarBuilder, members: &[Rule]) -> GrammarResult<Rule> {
        let any_order = b.permutation_sep(members, self.comma)?;
        self.object(b, any_order)
    }

    /// Strips [`BODY_PREFIX`] before matching `inner`.
    pub fn with_prefix(&self, b: &mut GrammarBuilder, inner: Rule) -> GrammarResult<Rule> {
        b.right(self.prefix, inner)
    }
}
