//! Kconfig schema parser.
//!
//! Reads a top-level Kconfig file (following `source` includes) into a
//! [`Schema`]: every defined symbol with its properties, and every choice.
//! Dependencies inherited from enclosing `if` blocks, menus and choices are
//! folded into each property's condition here, so evaluation never needs to
//! know about the menu structure.

use super::expr::{Expr, Operand, parse_condition, parse_expr, parse_operand};
use super::lexer::{Token, Tokens, tokenize};
use crate::model::SymbolType;
use crate::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Maximum nesting of `source` statements.
const MAX_SOURCE_DEPTH: usize = 32;

/// A place in a schema file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: PathBuf,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct Prompt {
    pub text: String,
    pub cond: Expr,
}

#[derive(Debug, Clone)]
pub struct DefaultProp {
    pub value: Expr,
    pub cond: Expr,
}

#[derive(Debug, Clone)]
pub struct RangeProp {
    pub low: Operand,
    pub high: Operand,
    pub cond: Expr,
}

/// A symbol selected by another, with the selecting condition.
#[derive(Debug, Clone)]
pub struct ReverseDep {
    pub selector: String,
    pub cond: Expr,
}

/// Everything the schema says about one symbol, merged across definitions.
#[derive(Debug, Clone)]
pub struct SymbolDef {
    pub name: String,
    pub kind: SymbolType,
    pub prompts: Vec<Prompt>,
    pub defaults: Vec<DefaultProp>,
    pub ranges: Vec<RangeProp>,
    pub selected_by: Vec<ReverseDep>,
    /// OR of the dependencies of every definition.
    pub direct_dep: Expr,
    /// Help text of the first definition.
    pub help: Option<String>,
    pub choice: Option<usize>,
    pub locations: Vec<Location>,
}

#[derive(Debug, Clone)]
pub struct ChoiceDef {
    pub name: Option<String>,
    pub prompts: Vec<Prompt>,
    /// `default SYM if COND` entries.
    pub defaults: Vec<(String, Expr)>,
    /// Member symbol indices, in declaration order.
    pub members: Vec<usize>,
    pub optional: bool,
    pub location: Location,
}

/// A parsed Kconfig tree.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub symbols: Vec<SymbolDef>,
    pub choices: Vec<ChoiceDef>,
    /// The symbol marked with `modules`, if any.
    pub modules: Option<String>,
    pub mainmenu: Option<String>,
    index: HashMap<String, usize>,
}

impl Schema {
    /// Index of a defined symbol.
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&SymbolDef> {
        self.lookup(name).map(|i| &self.symbols[i])
    }
}

/// Parse the schema rooted at `path`. Relative `source` paths resolve
/// against `srctree`.
pub fn parse_file(path: &Path, srctree: &Path) -> Result<Schema> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::SchemaLoad {
        path: path.to_path_buf(),
        line: 0,
        message: format!("cannot read schema: {}", e),
    })?;
    parse_str(&content, path, srctree)
}

/// Parse schema text. `origin` names the text in error messages and is the
/// base for `rsource`.
pub fn parse_str(content: &str, origin: &Path, srctree: &Path) -> Result<Schema> {
    let mut parser = Parser::new(srctree);
    parser.parse_content(content, origin, 0)?;
    parser.finish(origin)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    If,
    Menu,
    Choice(usize),
}

/// An open `if`, `menu` or `choice` block.
#[derive(Debug)]
struct Block {
    kind: BlockKind,
    dep: Expr,
    visible: Expr,
    location: Location,
}

/// A `config` or `menuconfig` entry whose properties are still being read.
#[derive(Debug)]
struct PendingConfig {
    name: String,
    location: Location,
    kind: Option<SymbolType>,
    prompts: Vec<(String, Expr)>,
    defaults: Vec<(Expr, Expr)>,
    ranges: Vec<(Operand, Operand, Expr)>,
    selects: Vec<(String, Expr)>,
    depends: Vec<Expr>,
    help: Option<String>,
}

#[derive(Debug)]
struct PendingChoice {
    index: usize,
    kind: Option<SymbolType>,
    prompts: Vec<(String, Expr)>,
    defaults: Vec<(String, Expr)>,
    depends: Vec<Expr>,
}

#[derive(Debug)]
struct PendingMenu {
    depends: Vec<Expr>,
    visible: Vec<Expr>,
}

#[derive(Debug)]
enum Pending {
    Config(Box<PendingConfig>),
    Choice(PendingChoice),
    Menu(PendingMenu),
    /// `comment` entries only carry `depends on`, which has no effect on
    /// symbols.
    Comment,
}

struct Parser {
    srctree: PathBuf,
    schema: Schema,
    blocks: Vec<Block>,
    pending: Option<Pending>,
    /// `select` statements as (selector, target, condition, location),
    /// resolved once every symbol is known.
    selects: Vec<(String, String, Expr, Location)>,
}

/// Strip `n` columns of indentation (tabs expand to 8) from a line.
fn dedent(line: &str, n: usize) -> &str {
    let mut col = 0;
    for (i, c) in line.char_indices() {
        if col >= n {
            return &line[i..];
        }
        match c {
            ' ' => col += 1,
            '\t' => col = (col / 8 + 1) * 8,
            _ => return &line[i..],
        }
    }
    ""
}

fn indentation(line: &str) -> usize {
    let mut col = 0;
    for c in line.chars() {
        match c {
            ' ' => col += 1,
            '\t' => col = (col / 8 + 1) * 8,
            _ => break,
        }
    }
    col
}

fn and_all(exprs: &[Expr]) -> Expr {
    exprs
        .iter()
        .cloned()
        .fold(Expr::yes(), Expr::and)
}

impl Parser {
    fn new(srctree: &Path) -> Self {
        Self {
            srctree: srctree.to_path_buf(),
            schema: Schema::default(),
            blocks: Vec::new(),
            pending: None,
            selects: Vec::new(),
        }
    }

    fn outer_dep(&self) -> Expr {
        self.blocks
            .iter()
            .fold(Expr::yes(), |acc, b| Expr::and(acc, b.dep.clone()))
    }

    fn outer_visible(&self) -> Expr {
        self.blocks
            .iter()
            .fold(Expr::yes(), |acc, b| Expr::and(acc, b.visible.clone()))
    }

    fn current_choice(&self) -> Option<usize> {
        self.blocks.iter().rev().find_map(|b| match b.kind {
            BlockKind::Choice(i) => Some(i),
            _ => None,
        })
    }

    fn parse_content(&mut self, content: &str, file: &Path, depth: usize) -> Result<()> {
        let lines: Vec<&str> = content.lines().collect();
        let err = |line: usize, message: String| Error::SchemaLoad {
            path: file.to_path_buf(),
            line,
            message,
        };

        let mut i = 0;
        while i < lines.len() {
            let first_line = i + 1;

            // Join continuation lines.
            let mut logical = String::new();
            loop {
                let line = lines[i];
                i += 1;
                match line.strip_suffix('\\') {
                    Some(head) if i < lines.len() => {
                        logical.push_str(head);
                        logical.push(' ');
                    }
                    Some(head) => {
                        logical.push_str(head);
                        break;
                    }
                    None => {
                        logical.push_str(line);
                        break;
                    }
                }
            }

            let tokens = tokenize(&logical).map_err(|m| err(first_line, m))?;
            if tokens.is_empty() {
                continue;
            }
            let mut tokens = Tokens::new(tokens);
            let Some(Token::Word(keyword)) = tokens.next() else {
                return Err(err(first_line, "expected a keyword".to_string()));
            };
            let location = Location {
                file: file.to_path_buf(),
                line: first_line,
            };

            if keyword == "help" || keyword == "---help---" {
                tokens.expect_end().map_err(|m| err(first_line, m))?;
                let (text, consumed) = read_help(&lines[i..]);
                i += consumed;
                self.set_help(text).map_err(|m| err(first_line, m))?;
                continue;
            }

            self.handle_line(&keyword, &mut tokens, location, depth)
                .map_err(|e| match e {
                    LineError::Message(m) => err(first_line, m),
                    LineError::Fatal(e) => e,
                })?;
        }
        Ok(())
    }

    fn handle_line(
        &mut self,
        keyword: &str,
        tokens: &mut Tokens,
        location: Location,
        depth: usize,
    ) -> std::result::Result<(), LineError> {
        match keyword {
            "config" | "menuconfig" => {
                self.finish_pending();
                let name = tokens.expect_word("symbol name")?;
                tokens.expect_end()?;
                self.pending = Some(Pending::Config(Box::new(PendingConfig {
                    name,
                    location,
                    kind: None,
                    prompts: Vec::new(),
                    defaults: Vec::new(),
                    ranges: Vec::new(),
                    selects: Vec::new(),
                    depends: Vec::new(),
                    help: None,
                })));
            }
            "choice" => {
                self.finish_pending();
                let name = match tokens.next() {
                    Some(Token::Word(w)) => Some(w),
                    None => None,
                    Some(other) => return Err(format!("unexpected '{}'", other).into()),
                };
                tokens.expect_end()?;
                let index = self.schema.choices.len();
                self.schema.choices.push(ChoiceDef {
                    name,
                    prompts: Vec::new(),
                    defaults: Vec::new(),
                    members: Vec::new(),
                    optional: false,
                    location: location.clone(),
                });
                self.blocks.push(Block {
                    kind: BlockKind::Choice(index),
                    dep: Expr::yes(),
                    visible: Expr::yes(),
                    location,
                });
                self.pending = Some(Pending::Choice(PendingChoice {
                    index,
                    kind: None,
                    prompts: Vec::new(),
                    defaults: Vec::new(),
                    depends: Vec::new(),
                }));
            }
            "endchoice" => {
                self.finish_pending();
                tokens.expect_end()?;
                self.close_block("endchoice", |k| matches!(k, BlockKind::Choice(_)))?;
            }
            "menu" => {
                self.finish_pending();
                tokens.expect_string("menu title")?;
                tokens.expect_end()?;
                self.blocks.push(Block {
                    kind: BlockKind::Menu,
                    dep: Expr::yes(),
                    visible: Expr::yes(),
                    location,
                });
                self.pending = Some(Pending::Menu(PendingMenu {
                    depends: Vec::new(),
                    visible: Vec::new(),
                }));
            }
            "endmenu" => {
                self.finish_pending();
                tokens.expect_end()?;
                self.close_block("endmenu", |k| k == BlockKind::Menu)?;
            }
            "if" => {
                self.finish_pending();
                let dep = parse_expr(tokens)?;
                tokens.expect_end()?;
                self.blocks.push(Block {
                    kind: BlockKind::If,
                    dep,
                    visible: Expr::yes(),
                    location,
                });
            }
            "endif" => {
                self.finish_pending();
                tokens.expect_end()?;
                self.close_block("endif", |k| k == BlockKind::If)?;
            }
            "comment" => {
                self.finish_pending();
                tokens.expect_string("comment text")?;
                tokens.expect_end()?;
                self.pending = Some(Pending::Comment);
            }
            "mainmenu" => {
                self.finish_pending();
                let title = tokens.expect_string("main menu title")?;
                tokens.expect_end()?;
                self.schema.mainmenu.get_or_insert(title);
            }
            "source" | "rsource" | "osource" | "orsource" => {
                self.finish_pending();
                let target = tokens.expect_string("file name")?;
                tokens.expect_end()?;
                self.source(keyword, &target, &location, depth)
                    .map_err(LineError::Fatal)?;
            }
            _ => self.handle_property(keyword, tokens)?,
        }
        Ok(())
    }

    fn close_block(
        &mut self,
        keyword: &str,
        matches: impl Fn(BlockKind) -> bool,
    ) -> std::result::Result<(), LineError> {
        match self.blocks.last() {
            Some(block) if matches(block.kind) => {
                self.blocks.pop();
                Ok(())
            }
            Some(block) => Err(format!(
                "'{}' does not match the block opened at {}:{}",
                keyword,
                block.location.file.display(),
                block.location.line
            )
            .into()),
            None => Err(format!("'{}' without a matching opening", keyword).into()),
        }
    }

    fn source(
        &mut self,
        keyword: &str,
        target: &str,
        location: &Location,
        depth: usize,
    ) -> Result<()> {
        let optional = keyword.starts_with('o');
        let relative = keyword.ends_with("rsource");
        let base = if relative {
            location
                .file
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default()
        } else {
            self.srctree.clone()
        };
        let path = base.join(target);

        let load_err = |message: String| Error::SchemaLoad {
            path: location.file.clone(),
            line: location.line,
            message,
        };

        if depth >= MAX_SOURCE_DEPTH {
            return Err(load_err(format!("'{}' nested too deeply", target)));
        }
        if !path.is_file() {
            if optional {
                tracing::debug!(path = %path.display(), "skipping missing optional source");
                return Ok(());
            }
            return Err(load_err(format!("cannot find sourced file {}", path.display())));
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| load_err(format!("cannot read {}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "sourcing");
        self.parse_content(&content, &path, depth + 1)?;
        self.finish_pending();
        Ok(())
    }

    fn handle_property(
        &mut self,
        keyword: &str,
        tokens: &mut Tokens,
    ) -> std::result::Result<(), LineError> {
        let Some(pending) = self.pending.as_mut() else {
            return Err(
                format!("unknown keyword or property outside an entry: '{}'", keyword).into(),
            );
        };

        match (keyword, pending) {
            ("depends", pending) => {
                if !tokens.eat_word("on") {
                    return Err("expected 'depends on'".into());
                }
                let dep = parse_expr(tokens)?;
                tokens.expect_end()?;
                match pending {
                    Pending::Config(c) => c.depends.push(dep),
                    Pending::Choice(c) => c.depends.push(dep),
                    Pending::Menu(m) => m.depends.push(dep),
                    Pending::Comment => {}
                }
            }
            ("visible", Pending::Menu(menu)) => {
                if !tokens.eat_word("if") {
                    return Err("expected 'visible if'".into());
                }
                menu.visible.push(parse_expr(tokens)?);
                tokens.expect_end()?;
            }
            ("bool" | "boolean" | "tristate" | "string" | "int" | "hex", pending) => {
                let kind = SymbolType::parse(keyword).unwrap_or(SymbolType::Unknown);
                let prompt = match tokens.optional_string() {
                    Some(text) => Some((text, parse_condition(tokens)?)),
                    None => None,
                };
                tokens.expect_end()?;
                match pending {
                    Pending::Config(c) => {
                        set_kind(&mut c.kind, kind, &c.name);
                        c.prompts.extend(prompt);
                    }
                    Pending::Choice(c) => {
                        c.kind = Some(kind);
                        c.prompts.extend(prompt);
                    }
                    _ => {
                        return Err(format!(
                            "'{}' is only valid in config or choice entries",
                            keyword
                        )
                        .into());
                    }
                }
            }
            ("def_bool" | "def_tristate", Pending::Config(c)) => {
                let kind = if keyword == "def_bool" {
                    SymbolType::Bool
                } else {
                    SymbolType::Tristate
                };
                set_kind(&mut c.kind, kind, &c.name);
                let value = parse_expr(tokens)?;
                let cond = parse_condition(tokens)?;
                tokens.expect_end()?;
                c.defaults.push((value, cond));
            }
            ("prompt", pending) => {
                let text = tokens.expect_string("prompt text")?;
                let cond = parse_condition(tokens)?;
                tokens.expect_end()?;
                match pending {
                    Pending::Config(c) => c.prompts.push((text, cond)),
                    Pending::Choice(c) => c.prompts.push((text, cond)),
                    _ => return Err("'prompt' is only valid in config or choice entries".into()),
                }
            }
            ("default", Pending::Config(c)) => {
                let value = parse_expr(tokens)?;
                let cond = parse_condition(tokens)?;
                tokens.expect_end()?;
                c.defaults.push((value, cond));
            }
            ("default", Pending::Choice(c)) => {
                let sym = tokens.expect_word("choice member")?;
                let cond = parse_condition(tokens)?;
                tokens.expect_end()?;
                c.defaults.push((sym, cond));
            }
            ("range", Pending::Config(c)) => {
                let low = parse_operand(tokens)?;
                let high = parse_operand(tokens)?;
                let cond = parse_condition(tokens)?;
                tokens.expect_end()?;
                c.ranges.push((low, high, cond));
            }
            ("select", Pending::Config(c)) => {
                let target = tokens.expect_word("selected symbol")?;
                let cond = parse_condition(tokens)?;
                tokens.expect_end()?;
                c.selects.push((target, cond));
            }
            ("optional", Pending::Choice(c)) => {
                tokens.expect_end()?;
                self.schema.choices[c.index].optional = true;
            }
            ("modules", Pending::Config(c)) => {
                tokens.expect_end()?;
                self.schema.modules = Some(c.name.clone());
            }
            ("option", pending) => {
                let option = tokens.expect_word("option name")?;
                match (option.as_str(), pending) {
                    ("modules", Pending::Config(c)) => {
                        self.schema.modules = Some(c.name.clone());
                    }
                    _ => tracing::debug!(option, "ignoring option"),
                }
            }
            (keyword, _) => {
                return Err(format!("unknown or misplaced property '{}'", keyword).into());
            }
        }
        Ok(())
    }

    fn set_help(&mut self, text: String) -> std::result::Result<(), String> {
        match self.pending.as_mut() {
            Some(Pending::Config(c)) => {
                c.help = Some(text);
                Ok(())
            }
            Some(Pending::Choice(_)) | Some(Pending::Comment) | Some(Pending::Menu(_)) => Ok(()),
            None => Err("'help' outside an entry".to_string()),
        }
    }

    /// Fold the pending entry into the schema.
    fn finish_pending(&mut self) {
        match self.pending.take() {
            Some(Pending::Config(c)) => self.finish_config(*c),
            Some(Pending::Choice(c)) => self.finish_choice(c),
            Some(Pending::Menu(m)) => {
                if let Some(block) = self.blocks.last_mut() {
                    block.dep = and_all(&m.depends);
                    block.visible = and_all(&m.visible);
                }
            }
            Some(Pending::Comment) | None => {}
        }
    }

    fn finish_choice(&mut self, c: PendingChoice) {
        let dep = and_all(&c.depends);
        let outer = Expr::and(self.outer_dep(), dep.clone());
        let visible = self.outer_visible();
        let choice = &mut self.schema.choices[c.index];
        choice.prompts = c
            .prompts
            .into_iter()
            .map(|(text, cond)| Prompt {
                text,
                cond: Expr::and(visible.clone(), Expr::and(outer.clone(), cond)),
            })
            .collect();
        choice.defaults = c
            .defaults
            .into_iter()
            .map(|(sym, cond)| (sym, Expr::and(outer.clone(), cond)))
            .collect();
        if let Some(kind) = c.kind {
            if kind != SymbolType::Bool {
                tracing::warn!(
                    line = choice.location.line,
                    "only bool choices are supported, treating {} choice as bool",
                    kind
                );
            }
        }
        // The choice block is on top of the stack while its own properties
        // are read.
        if let Some(block) = self.blocks.last_mut() {
            block.dep = dep;
        }
    }

    fn finish_config(&mut self, c: PendingConfig) {
        let node_dep = Expr::and(self.outer_dep(), and_all(&c.depends));
        let visible = self.outer_visible();
        let choice = self.current_choice();

        let index = match self.schema.lookup(&c.name) {
            Some(i) => i,
            None => {
                let i = self.schema.symbols.len();
                self.schema.index.insert(c.name.clone(), i);
                self.schema.symbols.push(SymbolDef {
                    name: c.name.clone(),
                    kind: SymbolType::Unknown,
                    prompts: Vec::new(),
                    defaults: Vec::new(),
                    ranges: Vec::new(),
                    selected_by: Vec::new(),
                    direct_dep: Expr::no(),
                    help: None,
                    choice: None,
                    locations: Vec::new(),
                });
                i
            }
        };

        let def = &mut self.schema.symbols[index];
        let first_definition = def.locations.is_empty();
        if let Some(kind) = c.kind {
            if def.kind == SymbolType::Unknown {
                def.kind = kind;
            } else if def.kind != kind {
                tracing::warn!(
                    symbol = %def.name,
                    "{} redefined as {}, keeping {}",
                    def.kind,
                    kind,
                    def.kind
                );
            }
        }
        if first_definition {
            def.help = c.help;
        }
        def.direct_dep = Expr::or(def.direct_dep.clone(), node_dep.clone());
        def.prompts.extend(c.prompts.into_iter().map(|(text, cond)| Prompt {
            text,
            cond: Expr::and(visible.clone(), Expr::and(node_dep.clone(), cond)),
        }));
        def.defaults.extend(c.defaults.into_iter().map(|(value, cond)| DefaultProp {
            value,
            cond: Expr::and(node_dep.clone(), cond),
        }));
        def.ranges.extend(c.ranges.into_iter().map(|(low, high, cond)| RangeProp {
            low,
            high,
            cond: Expr::and(node_dep.clone(), cond),
        }));
        for (target, cond) in c.selects {
            self.selects.push((
                c.name.clone(),
                target,
                Expr::and(node_dep.clone(), cond),
                c.location.clone(),
            ));
        }
        def.locations.push(c.location);

        if let Some(choice) = choice {
            if def.kind == SymbolType::Unknown {
                def.kind = SymbolType::Bool;
            }
            if def.choice.is_none() {
                def.choice = Some(choice);
                self.schema.choices[choice].members.push(index);
            }
        }
    }

    fn finish(mut self, origin: &Path) -> Result<Schema> {
        self.finish_pending();

        if let Some(block) = self.blocks.last() {
            let what = match block.kind {
                BlockKind::If => "if",
                BlockKind::Menu => "menu",
                BlockKind::Choice(_) => "choice",
            };
            return Err(Error::SchemaLoad {
                path: block.location.file.clone(),
                line: block.location.line,
                message: format!("'{}' is never closed", what),
            });
        }

        for (selector, target, cond, location) in std::mem::take(&mut self.selects) {
            match self.schema.lookup(&target) {
                Some(i) if self.schema.symbols[i].kind.is_bool_or_tristate() => {
                    self.schema.symbols[i]
                        .selected_by
                        .push(ReverseDep { selector, cond });
                }
                _ => tracing::warn!(
                    file = %location.file.display(),
                    line = location.line,
                    "{} selects {}, which is not a defined bool or tristate symbol",
                    selector,
                    target
                ),
            }
        }

        tracing::debug!(
            origin = %origin.display(),
            symbols = self.schema.symbols.len(),
            choices = self.schema.choices.len(),
            "schema parsed"
        );
        Ok(self.schema)
    }
}

fn set_kind(slot: &mut Option<SymbolType>, kind: SymbolType, name: &str) {
    match slot {
        Some(existing) if *existing != kind => {
            tracing::warn!(symbol = name, "type {} overrides {}", kind, existing);
            *slot = Some(kind);
        }
        _ => *slot = Some(kind),
    }
}

/// Collect the help block following a `help` line. The block ends at the
/// first non-blank line indented less than its first line. Returns the text
/// and the number of lines consumed.
fn read_help(lines: &[&str]) -> (String, usize) {
    let mut consumed = 0;
    while consumed < lines.len() && lines[consumed].trim().is_empty() {
        consumed += 1;
    }
    let Some(first) = lines.get(consumed) else {
        return (String::new(), lines.len());
    };
    let indent = indentation(first);
    if indent == 0 {
        return (String::new(), consumed);
    }

    let mut text: Vec<&str> = Vec::new();
    while consumed < lines.len() {
        let line = lines[consumed];
        if line.trim().is_empty() {
            text.push("");
        } else if indentation(line) >= indent {
            text.push(dedent(line, indent).trim_end());
        } else {
            break;
        }
        consumed += 1;
    }
    while text.last() == Some(&"") {
        text.pop();
    }
    (text.join("\n"), consumed)
}

/// A failure while handling one line: either a message to be tagged with the
/// line's location, or an already located error from a sourced file.
enum LineError {
    Message(String),
    Fatal(Error),
}

impl From<String> for LineError {
    fn from(message: String) -> Self {
        LineError::Message(message)
    }
}

impl From<&str> for LineError {
    fn from(message: &str) -> Self {
        LineError::Message(message.to_string())
    }
}
