//! Immutable grammar registry
//!
//! A [`Registry`] bundles one frozen [`Grammar`] holding the standard HTTP
//! and JSON rules with the handles needed to use it. It is built once,
//! optionally extended with application rules at construction time, and
//! then passed by reference to every parse.
//!
//! The convenience parsers ([`parse_request`](Registry::parse_request) and
//! friends) match a prefix of the input by default. With the
//! `check_complete_parse` feature they require the whole buffer to be
//! consumed instead.

use crate::error::GrammarResult;
use crate::grammar::{Grammar, GrammarBuilder, Rule};
use crate::http::HttpRules;
use crate::json::JsonRules;
use crate::parse::error::ParseResult;
use crate::parse::{ParseConfig, Parsed};

cfg_if::cfg_if! {
    if #[cfg(feature = "check_complete_parse")] {
        fn entry(b: &mut GrammarBuilder, rule: Rule) -> GrammarResult<Rule> {
            b.end(rule)
        }
    } else {
        fn entry(_: &mut GrammarBuilder, rule: Rule) -> GrammarResult<Rule> {
            Ok(rule)
        }
    }
}

lazy_static::lazy_static! {
    static ref SHARED: GrammarResult<Registry> = Registry::standard();
}

#[derive(Debug)]
pub struct Registry {
    grammar: Grammar,
    http: HttpRules,
    json: JsonRules,
    config: ParseConfig,
    request: Rule,
    response: Rule,
    json_response: Rule,
    document: Rule,
}

impl Registry {
    /// Registry holding only the standard rules.
    pub fn standard() -> GrammarResult<Self> {
        Self::build_with(|_, _, _| Ok(())).map(|(registry, ())| registry)
    }

    /// Process-wide registry of standard rules, built on first use.
    pub fn shared() -> GrammarResult<&'static Registry> {
        SHARED.as_ref().map_err(Clone::clone)
    }

    /// Builds a registry, letting `extend` add application rules next to the
    /// standard ones before the grammar is frozen.
    ///
    /// Whatever `extend` returns, typically the handles of the added rules,
    /// is handed back alongside the registry.
    pub fn build_with<T, F>(extend: F) -> GrammarResult<(Self, T)>
    where
        F: FnOnce(&mut GrammarBuilder, &HttpRules, &JsonRules) -> GrammarResult<T>,
    {
        let mut b = GrammarBuilder::new();
        let http = HttpRules::install(&mut b)?;
        let json = JsonRules::install(&mut b)?;

        let headers = b.many(http.any_header)?;
        let json_body = http.response_with(&mut b, http.any_status_code, headers, json.document)?;

        let request = entry(&mut b, http.request)?;
        let response = entry(&mut b, http.response)?;
        let json_response = entry(&mut b, json_body)?;
        let document = entry(&mut b, json.document)?;

        let extra = extend(&mut b, &http, &json)?;
        let grammar = b.build()?;
        Ok((
            Self {
                grammar,
                http,
                json,
                config: ParseConfig::default(),
                request,
                response,
                json_response,
                document,
            },
            extra,
        ))
    }

    #[must_use]
    pub fn with_config(mut self, config: ParseConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ParseConfig {
        &self.config
    }

    #[must_use]
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    #[must_use]
    pub fn http(&self) -> &HttpRules {
        &self.http
    }

    #[must_use]
    pub fn json(&self) -> &JsonRules {
        &self.json
    }

    /// Response rule whose body is a JSON document
    #[must_use]
    pub fn json_response(&self) -> Rule {
        self.json_response
    }

    /// Matches any rule of the registry under its configured limits.
    pub fn parse(&self, rule: Rule, input: &[u8]) -> ParseResult<Parsed> {
        self.grammar.try_parse_with(rule, input, &self.config)
    }

    /// Matches a generic request, producing `((method uri) headers body)`.
    pub fn parse_request(&self, input: &[u8]) -> ParseResult<Parsed> {
        self.parse(self.request, input)
    }

    /// Matches a generic response, producing `(code headers body)`.
    pub fn parse_response(&self, input: &[u8]) -> ParseResult<Parsed> {
        self.parse(self.response, input)
    }

    /// Matches a JSON value with optional surrounding whitespace.
    pub fn parse_json(&self, input: &[u8]) -> ParseResult<Parsed> {
        self.parse(self.document, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::value::{JsonNumber, JsonValue};
    use crate::parse::error::ParseError;
    use crate::parse::DEFAULT_MAX_DEPTH;

    fn dummy<T: Send + Sync>() {}

    #[test]
    fn registry_threadsafe() {
        dummy::<Registry>()
    }

    #[test]
    fn response_with_json_body() {
        let registry = Registry::standard().unwrap();
        let input = b"HTTP/1.1 200 OK\r\nHost: h\r\n\r\n{\"a\":1}";

        let parsed = registry.parse_response(input).unwrap();
        assert_eq!(parsed.consumed(), input.len());
        let root = parsed.root().unwrap();
        assert_eq!(root.child(0).unwrap().bytes(), Some(&b"200"[..]));
        let headers = root.child(1).unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.to_string(), "((<48.6f.73.74> <68>))");
        let body = root.child(2).unwrap().bytes().unwrap();

        let json = registry.parse_json(body).unwrap();
        let value = JsonValue::from_parsed(&json).unwrap();
        assert_eq!(
            value.get(b"a").and_then(JsonValue::as_number).and_then(JsonNumber::as_i64),
            Some(1)
        );

        let typed = registry.parse(registry.json_response(), input).unwrap();
        let body = typed.root().unwrap().child(2).unwrap();
        assert_eq!(JsonValue::try_from(body).unwrap(), value);
    }

    #[test]
    fn requests() {
        let registry = Registry::shared().unwrap();
        let parsed = registry
            .parse_request(b"GET /index.html HTTP/1.1\r\nAccept-Ranges: bytes\r\n\r\n")
            .unwrap();
        assert_eq!(
            parsed.root().unwrap().child(0).unwrap().to_string(),
            "(<47.45.54> <2f.69.6e.64.65.78.2e.68.74.6d.6c>)"
        );
        assert_eq!(
            registry.parse_request(b"GET /x HTTP/1.0\r\n\r\n").err(),
            Some(ParseError::NoMatch)
        );
    }

    #[test]
    fn application_rules() {
        let (registry, login) = Registry::build_with(|b, http, json| {
            let user = json.name_value_pair(b, b"user", json.any_string)?;
            let pin = json.name_value_pair(b, b"pin", json.any_number)?;
            let body = json.object_any_order(b, &[user, pin])?;
            let host = http.named_header(b, b"Host")?;
            let post = http.post(b, b"/login", host, body)?;
            b.end(post)
        })
        .unwrap();

        let ok = b"POST /login HTTP/1.1\r\nHost: a\r\n\r\n{\"pin\": 1234, \"user\": \"bob\"}";
        let parsed = registry.parse(login, ok).unwrap();
        assert_eq!(
            parsed.root().unwrap().to_string(),
            "(<2f.6c.6f.67.69.6e> (<48.6f.73.74> <61>) \
             ((<75.73.65.72> #3:<62.6f.62>) (<70.69.6e> #4:<31.32.33.34>)))"
        );
        let missing = b"POST /login HTTP/1.1\r\nHost: a\r\n\r\n{\"user\": \"bob\"}";
        assert_eq!(registry.parse(login, missing).err(), Some(ParseError::NoMatch));
    }

    #[test]
    fn configured_limits() {
        let registry = Registry::standard()
            .unwrap()
            .with_config(ParseConfig::new().with_max_input_len(8).with_max_depth(64));
        assert_eq!(
            registry.parse_json(b"[1, 2, 3, 4]").err(),
            Some(ParseError::InputTooLarge { len: 12, limit: 8 })
        );
        assert_eq!(registry.parse_json(b"[[[[").err(), Some(ParseError::NoMatch));

        let registry = registry.with_config(ParseConfig::new().with_max_depth(64));
        let deep: Vec<u8> = std::iter::repeat(b'[')
            .take(50)
            .chain(std::iter::repeat(b']').take(50))
            .collect();
        assert_eq!(
            registry.parse_json(&deep).err(),
            Some(ParseError::DepthExceeded { limit: 64 })
        );
        assert!(Registry::shared().unwrap().parse_json(&deep).is_ok());
    }

    #[test]
    fn default_depth_limit_fits_a_small_stack() {
        let outcome = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(|| {
                let registry = Registry::standard().unwrap();
                let arrays = vec![b'['; 1000];
                let objects: Vec<u8> = b"{\"a\":[".iter().copied().cycle().take(6 * 1000).collect();
                (
                    registry.parse_json(&arrays).err(),
                    registry.parse_json(&objects).err(),
                )
            })
            .unwrap()
            .join()
            .unwrap();
        let exceeded = Some(ParseError::DepthExceeded {
            limit: DEFAULT_MAX_DEPTH,
        });
        assert_eq!(outcome, (exceeded, exceeded));
    }

    #[test]
    fn large_body_is_one_token() {
        let registry = Registry::shared().unwrap();
        let mut input = b"HTTP/1.1 200 OK\r\nHost: h\r\n\r\n".to_vec();
        let head = input.len();
        input.resize(head + (1 << 20), b'x');

        let parsed = registry.parse_response(&input).unwrap();
        assert_eq!(parsed.consumed(), input.len());
        let body = parsed.root().unwrap().child(2).unwrap();
        assert_eq!(body.bytes(), Some(&input[head..]));
        assert!(parsed.arena().len() < 1024);
    }
}
