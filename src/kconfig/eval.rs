//! Symbol value resolution.
//!
//! Values are computed on demand and memoized. A symbol whose value depends
//! on itself is evaluated as `n` on the recursive visit.

use super::expr::{Expr, Operand};
use super::parser::{Schema, SymbolDef};
use crate::model::{SymbolType, Tristate};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// A user assignment from the values file, already checked against the
/// symbol's type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserValue {
    pub value: String,
    /// Assignment order; the latest `y` among choice members wins.
    pub seq: usize,
}

/// Outcome of resolving one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Normalized string value (`y`/`m`/`n` for bool and tristate).
    pub value: String,
    pub tri: Tristate,
    /// Whether the symbol belongs in the written configuration.
    pub written: bool,
}

impl Resolved {
    fn unset() -> Self {
        Self {
            value: String::new(),
            tri: Tristate::No,
            written: false,
        }
    }

    fn tristate(tri: Tristate, written: bool) -> Self {
        Self {
            value: tri.as_str().to_string(),
            tri,
            written,
        }
    }
}

pub struct Evaluator<'a> {
    schema: &'a Schema,
    user: &'a HashMap<String, UserValue>,
    cache: HashMap<usize, Resolved>,
    selections: HashMap<usize, Option<usize>>,
    active: HashSet<usize>,
    active_choices: HashSet<usize>,
}

impl<'a> Evaluator<'a> {
    pub fn new(schema: &'a Schema, user: &'a HashMap<String, UserValue>) -> Self {
        Self {
            schema,
            user,
            cache: HashMap::new(),
            selections: HashMap::new(),
            active: HashSet::new(),
            active_choices: HashSet::new(),
        }
    }

    /// Resolve the symbol at `index` in the schema.
    pub fn resolve(&mut self, index: usize) -> Resolved {
        if let Some(resolved) = self.cache.get(&index) {
            return resolved.clone();
        }
        if !self.active.insert(index) {
            tracing::warn!(
                symbol = %self.schema.symbols[index].name,
                "dependency loop, evaluating as n"
            );
            return Resolved::unset();
        }

        let schema = self.schema;
        let def = &schema.symbols[index];
        let resolved = match def.kind {
            SymbolType::Bool | SymbolType::Tristate => self.resolve_tristate(index, def),
            SymbolType::String => self.resolve_string(def),
            SymbolType::Int | SymbolType::Hex => self.resolve_number(def),
            SymbolType::Unknown => Resolved::unset(),
        };

        self.active.remove(&index);
        self.cache.insert(index, resolved.clone());
        resolved
    }

    /// Evaluate an expression in tristate logic.
    pub fn eval(&mut self, expr: &Expr) -> Tristate {
        match expr {
            Expr::Term(operand) => self.operand_tri(operand),
            Expr::Not(e) => self.eval(e).not(),
            Expr::And(a, b) => match self.eval(a) {
                Tristate::No => Tristate::No,
                lhs => lhs.and(self.eval(b)),
            },
            Expr::Or(a, b) => match self.eval(a) {
                Tristate::Yes => Tristate::Yes,
                lhs => lhs.or(self.eval(b)),
            },
            Expr::Cmp(op, lhs, rhs) => Tristate::from_bool(op.holds(self.compare(lhs, rhs))),
        }
    }

    /// String value of an operand: a defined symbol's value, or the operand's
    /// own spelling.
    pub fn operand_str(&mut self, operand: &Operand) -> String {
        match operand {
            Operand::Const(s) => s.clone(),
            Operand::Sym(name) => match self.schema.lookup(name) {
                Some(i) if self.schema.symbols[i].kind != SymbolType::Unknown => {
                    self.resolve(i).value
                }
                _ => name.clone(),
            },
        }
    }

    fn operand_tri(&mut self, operand: &Operand) -> Tristate {
        match operand {
            Operand::Const(s) => Tristate::parse(s).unwrap_or(Tristate::No),
            Operand::Sym(name) => match self.schema.lookup(name) {
                Some(i) if self.schema.symbols[i].kind.is_bool_or_tristate() => self.resolve(i).tri,
                Some(_) => Tristate::No,
                None => Tristate::parse(name).unwrap_or(Tristate::No),
            },
        }
    }

    fn operand_kind(&self, operand: &Operand) -> SymbolType {
        match operand {
            Operand::Sym(name) => self
                .schema
                .get(name)
                .map(|d| d.kind)
                .unwrap_or(SymbolType::Unknown),
            Operand::Const(_) => SymbolType::Unknown,
        }
    }

    /// Numeric value of an operand. Untyped operands are read as hex when
    /// `hex` is set.
    fn operand_num(&mut self, operand: &Operand, hex: bool) -> Option<i128> {
        let kind = self.operand_kind(operand);
        if kind.is_bool_or_tristate() {
            return Some(self.operand_tri(operand) as i128);
        }
        let s = self.operand_str(operand);
        match kind {
            SymbolType::Hex => parse_hex(&s),
            SymbolType::Int => s.trim().parse().ok(),
            _ if hex => parse_hex(&s),
            _ => parse_auto(&s),
        }
    }

    /// Numeric comparison when both sides are numbers, string comparison
    /// otherwise. Two string symbols always compare as strings; a hex symbol
    /// on either side makes the comparison hexadecimal.
    fn compare(&mut self, lhs: &Operand, rhs: &Operand) -> Ordering {
        let (lhs_kind, rhs_kind) = (self.operand_kind(lhs), self.operand_kind(rhs));
        let both_strings = lhs_kind == SymbolType::String && rhs_kind == SymbolType::String;
        if !both_strings {
            let hex = lhs_kind == SymbolType::Hex || rhs_kind == SymbolType::Hex;
            if let (Some(a), Some(b)) = (self.operand_num(lhs, hex), self.operand_num(rhs, hex)) {
                return a.cmp(&b);
            }
        }
        let a = self.operand_str(lhs);
        let b = self.operand_str(rhs);
        a.cmp(&b)
    }

    fn modules_enabled(&mut self) -> bool {
        let schema = self.schema;
        match schema.modules.as_deref().and_then(|m| schema.lookup(m)) {
            Some(i) => self.resolve(i).tri != Tristate::No,
            None => false,
        }
    }

    /// Whether `m` must round up to `y` for this symbol.
    fn behaves_as_bool(&mut self, def: &SymbolDef) -> bool {
        def.kind == SymbolType::Bool || def.choice.is_some() || !self.modules_enabled()
    }

    fn visibility(&mut self, def: &SymbolDef) -> Tristate {
        let mut vis = Tristate::No;
        for prompt in &def.prompts {
            vis = vis.or(self.eval(&prompt.cond));
        }
        if vis == Tristate::Module && def.kind.is_bool_or_tristate() && self.behaves_as_bool(def) {
            vis = Tristate::Yes;
        }
        if let Some(choice) = def.choice {
            vis = vis.and(self.choice_visibility(choice));
        }
        vis
    }

    fn user_value(&self, def: &SymbolDef) -> Option<&'a UserValue> {
        let user: &'a HashMap<String, UserValue> = self.user;
        user.get(&def.name)
    }

    fn resolve_tristate(&mut self, index: usize, def: &SymbolDef) -> Resolved {
        let vis = self.visibility(def);

        if let Some(choice) = def.choice {
            if vis == Tristate::No {
                return Resolved::tristate(Tristate::No, false);
            }
            let selected = self.choice_selection(choice) == Some(index);
            return Resolved::tristate(Tristate::from_bool(selected && vis == Tristate::Yes), true);
        }

        let mut written = vis != Tristate::No;
        let mut val = Tristate::No;

        match self.user_value(def).and_then(|u| Tristate::parse(&u.value)) {
            Some(user) if vis != Tristate::No => val = user.min(vis),
            _ => {
                for default in &def.defaults {
                    let cond = self.eval(&default.cond);
                    if cond != Tristate::No {
                        val = self.eval(&default.value).min(cond);
                        if val != Tristate::No {
                            written = true;
                        }
                        break;
                    }
                }
            }
        }

        let mut selected = Tristate::No;
        for rev in &def.selected_by {
            let selector = self.operand_tri(&Operand::Sym(rev.selector.clone()));
            selected = selected.or(selector.and(self.eval(&rev.cond)));
        }
        if selected != Tristate::No {
            if self.eval(&def.direct_dep) < selected {
                tracing::warn!(symbol = %def.name, "selected while its dependencies are not met");
            }
            val = val.max(selected);
            written = true;
        }

        if val == Tristate::Module && self.behaves_as_bool(def) {
            val = Tristate::Yes;
        }
        Resolved::tristate(val, written)
    }

    fn resolve_string(&mut self, def: &SymbolDef) -> Resolved {
        let vis = self.visibility(def);
        let mut written = vis != Tristate::No;
        let mut value = String::new();

        match self.user_value(def) {
            Some(user) if vis != Tristate::No => value = user.value.clone(),
            _ => {
                for default in &def.defaults {
                    if self.eval(&default.cond) != Tristate::No {
                        value = self.default_str(&default.value);
                        written = true;
                        break;
                    }
                }
            }
        }

        Resolved {
            value,
            tri: Tristate::No,
            written,
        }
    }

    fn resolve_number(&mut self, def: &SymbolDef) -> Resolved {
        let hex = def.kind == SymbolType::Hex;
        let parse = |s: &str| {
            if hex {
                parse_hex(s)
            } else {
                s.trim().parse::<i128>().ok()
            }
        };

        let vis = self.visibility(def);
        let mut written = vis != Tristate::No;

        let mut active_range = None;
        for range in &def.ranges {
            if self.eval(&range.cond) == Tristate::No {
                continue;
            }
            let low = self.operand_str(&range.low);
            let high = self.operand_str(&range.high);
            match (parse(&low), parse(&high)) {
                (Some(low), Some(high)) => {
                    active_range = Some((low, high));
                    break;
                }
                _ => {
                    tracing::warn!(
                        symbol = %def.name,
                        %low,
                        %high,
                        "range bound is not a valid {} value, ignoring range",
                        def.kind
                    );
                }
            }
        }

        if vis != Tristate::No {
            if let Some(user) = self.user_value(def) {
                if let Some(n) = parse(&user.value) {
                    match active_range {
                        Some((low, high)) if n < low || n > high => {
                            tracing::warn!(
                                symbol = %def.name,
                                value = %user.value,
                                "value outside range [{}, {}], using default",
                                render_number(low, hex),
                                render_number(high, hex)
                            );
                        }
                        _ => {
                            return Resolved {
                                value: user.value.clone(),
                                tri: Tristate::No,
                                written,
                            };
                        }
                    }
                }
            }
        }

        let mut value = String::new();
        let mut number = 0;
        let mut has_default = false;
        for default in &def.defaults {
            if self.eval(&default.cond) != Tristate::No {
                value = self.default_str(&default.value);
                number = parse(&value).unwrap_or(0);
                has_default = true;
                written = true;
                break;
            }
        }

        if let Some((low, high)) = active_range {
            let clamp = if number < low {
                Some(low)
            } else if number > high {
                Some(high)
            } else {
                None
            };
            if let Some(clamp) = clamp {
                value = render_number(clamp, hex);
                if has_default {
                    tracing::warn!(symbol = %def.name, "default clamped to {}", value);
                }
            }
        }

        Resolved {
            value,
            tri: Tristate::No,
            written,
        }
    }

    /// String value of a `default` expression: the operand's value for a
    /// single symbol or constant, otherwise the tristate result.
    fn default_str(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::Term(operand) => self.operand_str(operand),
            other => self.eval(other).as_str().to_string(),
        }
    }

    fn choice_visibility(&mut self, index: usize) -> Tristate {
        if !self.active_choices.insert(index) {
            return Tristate::No;
        }
        let schema = self.schema;
        let choice = &schema.choices[index];
        let mut vis = Tristate::No;
        for prompt in &choice.prompts {
            vis = vis.or(self.eval(&prompt.cond));
        }
        self.active_choices.remove(&index);
        // Only bool choices are modeled.
        if vis == Tristate::Module {
            Tristate::Yes
        } else {
            vis
        }
    }

    /// The selected member of a choice, if any.
    fn choice_selection(&mut self, index: usize) -> Option<usize> {
        if let Some(selection) = self.selections.get(&index) {
            return *selection;
        }
        let selection = self.compute_selection(index);
        self.selections.insert(index, selection);
        selection
    }

    fn compute_selection(&mut self, index: usize) -> Option<usize> {
        let schema = self.schema;
        let choice = &schema.choices[index];
        if self.choice_visibility(index) == Tristate::No {
            return None;
        }

        let mut visible = Vec::new();
        for &member in &choice.members {
            let def = &schema.symbols[member];
            let mut vis = Tristate::No;
            for prompt in &def.prompts {
                vis = vis.or(self.eval(&prompt.cond));
            }
            if vis != Tristate::No {
                visible.push(member);
            }
        }

        let user_choice = visible
            .iter()
            .copied()
            .filter_map(|m| {
                self.user
                    .get(&schema.symbols[m].name)
                    .filter(|u| u.value == "y")
                    .map(|u| (u.seq, m))
            })
            .max()
            .map(|(_, m)| m);
        if user_choice.is_some() {
            return user_choice;
        }
        if choice.optional {
            return None;
        }

        for (name, cond) in &choice.defaults {
            if self.eval(cond) == Tristate::No {
                continue;
            }
            if let Some(member) = schema.lookup(name).filter(|m| visible.contains(m)) {
                return Some(member);
            }
        }
        visible.first().copied()
    }
}

/// Parse a hex value with or without a `0x` prefix.
pub fn parse_hex(s: &str) -> Option<i128> {
    let s = s.trim();
    let (negative, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if digits.is_empty() {
        return None;
    }
    let n = i128::from_str_radix(digits, 16).ok()?;
    Some(if negative { -n } else { n })
}

/// Parse as hex when prefixed with `0x`, decimal otherwise.
fn parse_auto(s: &str) -> Option<i128> {
    let t = s.trim();
    if t.starts_with("0x") || t.starts_with("0X") {
        parse_hex(t)
    } else {
        t.parse().ok()
    }
}

fn render_number(n: i128, hex: bool) -> String {
    match (hex, n < 0) {
        (false, _) => n.to_string(),
        (true, false) => format!("{:#x}", n),
        (true, true) => format!("-{:#x}", n.unsigned_abs()),
    }
}
