//! HTTP/1.1 message grammar
//!
//! This module installs the rules for recognizing HTTP/1.1 requests and
//! responses, loosely following RFC 2616, into a [`GrammarBuilder`]. The
//! handles of the installed rules are collected in an [`HttpRules`] value,
//! whose methods construct further rules on top of them (named headers,
//! POST requests with caller-supplied header and body grammars, and so on).
//!
//! # Deviations from RFC 2616
//!
//! * Header names are restricted to `[A-Za-z0-9-_.]`.
//! * Header values and reason phrases only admit printable ASCII (`32..=126`)
//!   and horizontal tabs; there is no support for high-bit bytes.
//! * Linear whitespace is always folded into a single space scalar.
//! * A line break inside a header value that is not followed by a space or
//!   tab is not part of the value. This rejects injected headers of the form
//!   `AAA:BBB\r\nCCC:DDD\r\n` when a single header is expected.
//! * The message body is not framed: it is the remainder of the buffer.
//!
//! # Results
//!
//! | Rule | Token |
//! |------|-------|
//! | `lws` | scalar `0x20` |
//! | `header_name`, `header_value`, `request_uri`, `any_status_code`, `message_body` | byte-string |
//! | `general_header`, [`HttpRules::header`], [`HttpRules::named_header`] | `(name value)` |
//! | `status_line`, [`HttpRules::status_line`] | the status code only |
//! | `request_line` | `(method uri)` |
//! | [`HttpRules::request_line`] | the url only |
//! | `request`, `response` | `(start headers body)` |

use log::debug;

use crate::charset::CharSet;
use crate::error::{GrammarError, GrammarResult, LiteralKind};
use crate::grammar::{GrammarBuilder, Rule};
use crate::tree::{flatten, Arena, Token, TokenRef};

const UPPER: CharSet = CharSet::from_range(b'A', b'Z');
const ALNUM: CharSet = UPPER
    .union(CharSet::from_range(b'a', b'z'))
    .union(CharSet::from_range(b'0', b'9'));
const DIGIT: CharSet = CharSet::from_range(b'0', b'9');
const STATUS_CLASS: CharSet = CharSet::from_range(b'1', b'5');

/// Bytes allowed in header names
pub const HEADER_NAME_CHARS: CharSet = ALNUM.union(CharSet::from_bytes(b"-_."));

/// Bytes allowed in the literal target of a POST request; no query strings.
pub const POST_URL_CHARS: CharSet = ALNUM.union(CharSet::from_bytes(b"/."));

/// Bytes allowed in request methods
pub const METHOD_CHARS: CharSet = UPPER;

/// Request methods of RFC 2616 section 5.1.1
pub const STANDARD_METHODS: &[&[u8]] = &[
    b"OPTIONS", b"GET", b"HEAD", b"POST", b"PUT", b"DELETE", b"TRACE", b"CONNECT",
];

/// Response header names (RFC 2616 section 6.2)
pub const RESPONSE_HEADERS: &[&[u8]] = &[
    b"Accept-Ranges",
    b"Age",
    b"ETag",
    b"Location",
    b"Proxy-Authenticate",
    b"Retry-After",
    b"Vary",
    b"WWW-Authenticate",
];

/// Entity header names (RFC 2616 section 7.1)
pub const ENTITY_HEADERS: &[&[u8]] = &[
    b"Allow",
    b"Content-Encoding",
    b"Content-Language",
    b"Content-Length",
    b"Content-Location",
    b"Content-MD5",
    b"Content-Range",
    b"Content-Type",
    b"Expires",
    b"Last-Modified",
];

fn check_chars(kind: LiteralKind, set: &CharSet, literal: &[u8]) -> GrammarResult<()> {
    if literal.is_empty() {
        return Err(GrammarError::invalid(kind, literal, 0));
    }
    match set.first_outside(literal) {
        Some(offset) => Err(GrammarError::invalid(kind, literal, offset)),
        None => Ok(()),
    }
}

/// Accepts exactly three digits, the first of which is in `1..=5`.
fn check_status_code(code: &[u8]) -> GrammarResult<()> {
    for (ix, &b) in code.iter().enumerate() {
        let legal = match ix {
            0 => STATUS_CLASS.contains(b),
            1 | 2 => DIGIT.contains(b),
            _ => false,
        };
        if !legal {
            return Err(GrammarError::invalid(LiteralKind::StatusCode, code, ix));
        }
    }
    if code.len() < 3 {
        return Err(GrammarError::invalid(
            LiteralKind::StatusCode,
            code,
            code.len(),
        ));
    }
    Ok(())
}

/// Replaces any folded whitespace with a single space.
fn single_space(arena: &mut Arena, _: TokenRef) -> TokenRef {
    arena.alloc(Token::Uint(b' ' as u64))
}

/// Handles of the installed HTTP rules.
#[derive(Clone, Copy, Debug)]
pub struct HttpRules {
    pub sp: Rule,
    pub tab: Rule,
    pub cr: Rule,
    pub lf: Rule,
    pub crlf: Rule,
    /// Printable ASCII, `32..=126`
    pub ascii: Rule,
    /// `ascii` or tab
    pub reason_text: Rule,
    /// `HTTP/1.1`, suppressed
    pub http_version: Rule,
    /// `[CRLF] 1*( SP | HT )`
    pub lws: Rule,
    pub header_name: Rule,
    pub header_value: Rule,
    pub general_header: Rule,
    pub response_header: Rule,
    pub entity_header: Rule,
    /// Response, entity or general header, tried in that order
    pub any_header: Rule,
    pub any_method: Rule,
    pub post_method: Rule,
    pub request_uri: Rule,
    pub post_url_chars: Rule,
    pub any_status_code: Rule,
    pub reason_phrase: Rule,
    pub status_line: Rule,
    pub request_line: Rule,
    pub message_body: Rule,
    pub request: Rule,
    pub response: Rule,
    header_sep: Rule,
    line_end: Rule,
}

impl HttpRules {
    /// Installs the HTTP rules with the standard method set.
    pub fn install(b: &mut GrammarBuilder) -> GrammarResult<Self> {
        Self::install_with_methods(b, STANDARD_METHODS)
    }

    /// Installs the HTTP rules, accepting `methods` in generic request lines.
    ///
    /// Each method is validated against [`METHOD_CHARS`].
    pub fn install_with_methods(b: &mut GrammarBuilder, methods: &[&[u8]]) -> GrammarResult<Self> {
        let sp = b.ch(b' ');
        let tab = b.ch(b'\t');
        let cr = b.ch(b'\r');
        let lf = b.ch(b'\n');
        let crlf = b.literal(b"\r\n")?;
        let version = b.literal(b"HTTP/1.1")?;
        let http_version = b.suppress(version)?;
        let ascii = b.range(32, 126)?;
        let reason_text = b.choice(&[ascii, tab])?;

        let fold = b.optional(crlf)?;
        let blank = b.choice(&[sp, tab])?;
        let blanks = b.many1(blank)?;
        let folded = b.sequence(&[fold, blanks])?;
        let lws = b.action(folded, single_space)?;

        let name_char = b.set(HEADER_NAME_CHARS);
        let name_chars = b.many1(name_char)?;
        let header_name = b.action(name_chars, flatten)?;
        let value_part = b.choice(&[reason_text, lws])?;
        let value_parts = b.many(value_part)?;
        let header_value = b.action(value_parts, flatten)?;

        let colon = b.ch(b':');
        let opt_lws = b.optional(lws)?;
        let colon_lws = b.sequence(&[colon, opt_lws])?;
        let header_sep = b.suppress(colon_lws)?;
        let line_end = b.suppress(crlf)?;
        let line_sp = b.suppress(sp)?;

        let general_header = b.sequence(&[header_name, header_sep, header_value, line_end])?;
        let response_header =
            named_choice(b, RESPONSE_HEADERS, header_sep, header_value, line_end)?;
        let entity_header = named_choice(b, ENTITY_HEADERS, header_sep, header_value, line_end)?;
        let any_header = b.choice(&[response_header, entity_header, general_header])?;

        let method_rules = methods
            .iter()
            .map(|m| method_literal(b, m))
            .collect::<GrammarResult<Vec<_>>>()?;
        let any_method = b.choice(&method_rules)?;
        let post_method = method_literal(b, b"POST")?;

        let uri_char = b.range(33, 126)?;
        let uri_chars = b.many1(uri_char)?;
        let request_uri = b.action(uri_chars, flatten)?;
        let post_url_char = b.set(POST_URL_CHARS);
        let post_url_chars = b.many1(post_url_char)?;

        let class = b.set(STATUS_CLASS);
        let digit = b.set(DIGIT);
        let code = b.sequence(&[class, digit, digit])?;
        let any_status_code = b.action(code, flatten)?;
        let reason_phrase = b.many(reason_text)?;
        let status_line = status_line_of(b, http_version, sp, reason_phrase, crlf, any_status_code)?;

        let request_line = b.sequence(&[
            any_method,
            line_sp,
            request_uri,
            line_sp,
            http_version,
            line_end,
        ])?;

        let message_body = b.rest();

        let headers = b.many(any_header)?;
        let opt_body = b.optional(message_body)?;
        let response = b.sequence(&[status_line, headers, line_end, opt_body])?;
        let request = b.sequence(&[request_line, headers, line_end, opt_body])?;

        debug!(
            "installed HTTP rules with {} methods, {} named headers",
            methods.len(),
            RESPONSE_HEADERS.len() + ENTITY_HEADERS.len()
        );
        Ok(Self {
            sp,
            tab,
            cr,
            lf,
            crlf,
            ascii,
            reason_text,
            http_version,
            lws,
            header_name,
            header_value,
            general_header,
            response_header,
            entity_header,
            any_header,
            any_method,
            post_method,
            request_uri,
            post_url_chars,
            any_status_code,
            reason_phrase,
            status_line,
            request_line,
            message_body,
            request,
            response,
            header_sep,
            line_end,
        })
    }

    /// `name ":" [LWS] value CRLF`, producing `(name value)`.
    pub fn header(&self, b: &mut GrammarBuilder, name: Rule, value: Rule) -> GrammarResult<Rule> {
        b.sequence(&[name, self.header_sep, value, self.line_end])
    }

    /// A header whose name is exactly `name`, with any value.
    pub fn named_header(&self, b: &mut GrammarBuilder, name: &[u8]) -> GrammarResult<Rule> {
        named_header_of(b, name, self.header_sep, self.header_value, self.line_end)
    }

    /// Literal request method, restricted to upper-case letters.
    pub fn method(&self, b: &mut GrammarBuilder, name: &[u8]) -> GrammarResult<Rule> {
        method_literal(b, name)
    }

    /// Literal status code, which must be three digits in `100..=599`.
    pub fn status_code(&self, b: &mut GrammarBuilder, code: &[u8]) -> GrammarResult<Rule> {
        check_status_code(code)?;
        b.literal(code)
    }

    /// `HTTP/1.1 SP code SP reason CRLF`, producing the token of `code`.
    pub fn status_line(&self, b: &mut GrammarBuilder, code: Rule) -> GrammarResult<Rule> {
        status_line_of(
            b,
            self.http_version,
            self.sp,
            self.reason_phrase,
            self.crlf,
            code,
        )
    }

    /// `method SP url SP HTTP/1.1 CRLF`, producing the token of `url`.
    pub fn request_line(
        &self,
        b: &mut GrammarBuilder,
        method: Rule,
        url: Rule,
    ) -> GrammarResult<Rule> {
        let head = b.sequence(&[method, self.sp])?;
        let tail = b.sequence(&[self.sp, self.http_version, self.crlf])?;
        b.middle(head, url, tail)
    }

    /// A response with the given status code, header and body grammars,
    /// producing `(code headers body)`.
    pub fn response_with(
        &self,
        b: &mut GrammarBuilder,
        code: Rule,
        headers: Rule,
        body: Rule,
    ) -> GrammarResult<Rule> {
        let line = self.status_line(b, code)?;
        b.sequence(&[line, headers, self.line_end, body])
    }

    /// A request with the given request-line, header and body grammars,
    /// producing `(line headers body)`.
    pub fn request_with(
        &self,
        b: &mut GrammarBuilder,
        line: Rule,
        headers: Rule,
        body: Rule,
    ) -> GrammarResult<Rule> {
        b.sequence(&[line, headers, self.line_end, body])
    }

    /// A POST request to the literal `url`, producing `(url headers body)`.
    ///
    /// The url is validated against [`POST_URL_CHARS`], so query strings are
    /// rejected at construction.
    pub fn post(
        &self,
        b: &mut GrammarBuilder,
        url: &[u8],
        headers: Rule,
        body: Rule,
    ) -> GrammarResult<Rule> {
        check_chars(LiteralKind::PostUrl, &POST_URL_CHARS, url)?;
        let url = b.literal(url)?;
        let line = self.request_line(b, self.post_method, url)?;
        self.request_with(b, line, headers, body)
    }
}

fn method_literal(b: &mut GrammarBuilder, name: &[u8]) -> GrammarResult<Rule> {
    check_chars(LiteralKind::Method, &METHOD_CHARS, name)?;
    b.literal(name)
}

fn named_header_of(
    b: &mut GrammarBuilder,
    name: &[u8],
    sep: Rule,
    value: Rule,
    end: Rule,
) -> GrammarResult<Rule> {
    check_chars(LiteralKind::HeaderName, &HEADER_NAME_CHARS, name)?;
    let name = b.literal(name)?;
    b.sequence(&[name, sep, value, end])
}

fn named_choice(
    b: &mut GrammarBuilder,
    names: &[&[u8]],
    sep: Rule,
    value: Rule,
    end: Rule,
) -> GrammarResult<Rule> {
    let headers = names
        .iter()
        .map(|name| named_header_of(b, name, sep, value, end))
        .collect::<GrammarResult<Vec<_>>>()?;
    b.choice(&headers)
}

fn status_line_of(
    b: &mut GrammarBuilder,
    http_version: Rule,
    sp: Rule,
    reason_phrase: Rule,
    crlf: Rule,
    code: Rule,
) -> GrammarResult<Rule> {
    let head = b.sequence(&[http_version, sp])?;
    let tail = b.sequence(&[sp, reason_phrase, crlf])?;
    b.middle(head, code, tail)
}
