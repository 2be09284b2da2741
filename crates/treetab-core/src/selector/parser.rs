//! Selector expression parser

use crate::error::{Result, TreetabError};

/// What a single location step matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NodeTest {
    /// Child elements with this name
    Name(String),
    /// Any child element (`*`)
    AnyElement,
    /// `.`
    SelfNode,
    /// `..`
    Parent,
    /// `text()`
    Text,
    /// `@name`
    Attribute(String),
    /// `@*`
    AnyAttribute,
}

impl NodeTest {
    /// Attribute and text steps select leaves
    fn is_terminal(&self) -> bool {
        matches!(
            self,
            NodeTest::Text | NodeTest::Attribute(_) | NodeTest::AnyAttribute
        )
    }
}

/// Bracketed filter applied to the candidates of one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Predicate {
    /// `[n]`, 1-based
    Position(usize),
    /// `[last()]`
    Last,
    /// `[@name]`
    HasAttribute(String),
    /// `[@name='value']`
    AttributeEquals(String, String),
    /// `[name]`
    HasChild(String),
    /// `[name='value']`
    ChildEquals(String, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Step {
    /// Preceded by `//` rather than `/`
    pub descend: bool,
    pub test: NodeTest,
    pub predicates: Vec<Predicate>,
}

/// Parsed form of an expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Path {
    pub absolute: bool,
    pub steps: Vec<Step>,
}

struct Scanner<'a> {
    expr: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(expr: &'a str) -> Self {
        Self { expr, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.expr[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.expr.len()
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek().filter(|c| c.is_whitespace()) {
            self.pos += c.len_utf8();
        }
    }

    fn error(&self, message: impl Into<String>) -> TreetabError {
        TreetabError::InvalidSelector {
            expr: self.expr.to_string(),
            message: format!("{} (at offset {})", message.into(), self.pos),
        }
    }

    fn name(&mut self) -> Result<String> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_alphabetic() || c == '_' => {}
            Some(c) => return Err(self.error(format!("unexpected '{}'", c))),
            None => return Err(self.error("expected a name")),
        }
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':') {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        Ok(self.expr[start..self.pos].to_string())
    }

    fn literal(&mut self) -> Result<String> {
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected a quoted string")),
        };
        self.pos += 1;
        let start = self.pos;
        match self.rest().find(quote) {
            Some(len) => {
                self.pos += len + 1;
                Ok(self.expr[start..start + len].to_string())
            }
            None => Err(self.error("unterminated string")),
        }
    }
}

/// Parse a selector expression
pub(crate) fn parse(expr: &str) -> Result<Path> {
    let mut scanner = Scanner::new(expr.trim());
    if scanner.at_end() {
        return Err(scanner.error("empty expression"));
    }

    let absolute = scanner.peek() == Some('/');
    let mut steps = Vec::new();
    let mut first = true;

    loop {
        let descend = if scanner.eat("//") {
            true
        } else if scanner.eat("/") {
            false
        } else if first {
            false
        } else {
            return Err(scanner.error("expected '/'"));
        };

        if scanner.at_end() {
            // A lone "/" selects the document node itself.
            if first && absolute && !descend {
                break;
            }
            return Err(scanner.error("expression ends with '/'"));
        }

        if steps.last().is_some_and(|prev: &Step| prev.test.is_terminal()) {
            return Err(scanner.error("nothing may follow an attribute or text() step"));
        }

        steps.push(parse_step(&mut scanner, descend)?);
        first = false;

        if scanner.at_end() {
            break;
        }
    }

    Ok(Path { absolute, steps })
}

fn parse_step(scanner: &mut Scanner<'_>, descend: bool) -> Result<Step> {
    let test = if scanner.eat("..") {
        NodeTest::Parent
    } else if scanner.eat(".") {
        NodeTest::SelfNode
    } else if scanner.eat("@*") {
        NodeTest::AnyAttribute
    } else if scanner.eat("@") {
        NodeTest::Attribute(scanner.name()?)
    } else if scanner.eat("*") {
        NodeTest::AnyElement
    } else {
        let name = scanner.name()?;
        if name == "text" && scanner.eat("()") {
            NodeTest::Text
        } else {
            NodeTest::Name(name)
        }
    };

    let mut predicates = Vec::new();
    while scanner.eat("[") {
        if matches!(test, NodeTest::SelfNode | NodeTest::Parent) {
            return Err(scanner.error("predicates are not allowed on '.' or '..'"));
        }
        predicates.push(parse_predicate(scanner)?);
    }

    Ok(Step {
        descend,
        test,
        predicates,
    })
}

fn parse_predicate(scanner: &mut Scanner<'_>) -> Result<Predicate> {
    scanner.skip_ws();

    let predicate = if matches!(scanner.peek(), Some(c) if c.is_ascii_digit()) {
        let start = scanner.pos;
        while matches!(scanner.peek(), Some(c) if c.is_ascii_digit()) {
            scanner.pos += 1;
        }
        let position: usize = scanner.expr[start..scanner.pos]
            .parse()
            .map_err(|_| scanner.error("position out of range"))?;
        if position == 0 {
            return Err(scanner.error("positions start at 1"));
        }
        Predicate::Position(position)
    } else if scanner.eat("last()") {
        Predicate::Last
    } else if scanner.eat("@") {
        let name = scanner.name()?;
        match comparison(scanner)? {
            Some(value) => Predicate::AttributeEquals(name, value),
            None => Predicate::HasAttribute(name),
        }
    } else {
        let name = scanner.name()?;
        match comparison(scanner)? {
            Some(value) => Predicate::ChildEquals(name, value),
            None => Predicate::HasChild(name),
        }
    };

    scanner.skip_ws();
    if !scanner.eat("]") {
        return Err(scanner.error("expected ']'"));
    }
    Ok(predicate)
}

fn comparison(scanner: &mut Scanner<'_>) -> Result<Option<String>> {
    scanner.skip_ws();
    if scanner.eat("=") {
        scanner.skip_ws();
        scanner.literal().map(Some)
    } else {
        Ok(None)
    }
}
