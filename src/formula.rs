//! Formulas of differential dynamic logic.

crate::prelude!();

#[cfg(test)]
mod test;

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cmp {
    /// Equality.
    Eq,
    /// Disequality.
    Ne,
    /// Strictly less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Strictly greater than.
    Gt,
    /// Greater than or equal.
    Ge,
}
impl Cmp {
    /// Comparator of the negated relation.
    pub fn negate(self) -> Self {
        match self {
            Self::Eq => Self::Ne,
            Self::Ne => Self::Eq,
            Self::Lt => Self::Ge,
            Self::Le => Self::Gt,
            Self::Gt => Self::Le,
            Self::Ge => Self::Lt,
        }
    }

    /// Evaluates the comparison.
    pub fn eval(self, lft: &Rat, rgt: &Rat) -> bool {
        match self {
            Self::Eq => lft == rgt,
            Self::Ne => lft != rgt,
            Self::Lt => lft < rgt,
            Self::Le => lft <= rgt,
            Self::Gt => lft > rgt,
            Self::Ge => lft >= rgt,
        }
    }
}
impl fmt::Display for Cmp {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        };
        s.fmt(fmt)
    }
}

/// A dL formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Formula {
    /// Truth.
    True,
    /// Falsity.
    False,
    /// A relation between two terms.
    Rel {
        /// Left-hand side.
        lft: Term,
        /// Comparator.
        cmp: Cmp,
        /// Right-hand side.
        rgt: Term,
    },
    /// Conjunction.
    And(Vec<Formula>),
    /// Disjunction.
    Or(Vec<Formula>),
    /// Negation.
    Not(Box<Formula>),
    /// Implication.
    Implies(Box<Formula>, Box<Formula>),
    /// A term used as a boolean.
    ///
    /// Typically a variable carrying a logic signal, or a placeholder that a substitution will
    /// turn into an actual formula.
    Logic(Box<Term>),
    /// Box modality `[program]post`.
    Box(Box<Program>, Box<Formula>),
}

impl Formula {
    /// Relation constructor.
    pub fn rel(lft: Term, cmp: Cmp, rgt: Term) -> Self {
        Self::Rel { lft, cmp, rgt }
    }
    /// Conjunction constructor, yields `true` on no conjuncts.
    pub fn and(mut conjuncts: Vec<Formula>) -> Self {
        match conjuncts.len() {
            0 => Self::True,
            1 => conjuncts.pop().unwrap_or(Self::True),
            _ => Self::And(conjuncts),
        }
    }
    /// Disjunction constructor, yields `false` on no disjuncts.
    pub fn or(mut disjuncts: Vec<Formula>) -> Self {
        match disjuncts.len() {
            0 => Self::False,
            1 => disjuncts.pop().unwrap_or(Self::False),
            _ => Self::Or(disjuncts),
        }
    }
    /// Negation constructor, see also [`Self::negation`].
    #[allow(clippy::should_implement_trait)]
    pub fn not(f: Formula) -> Self {
        Self::Not(Box::new(f))
    }
    /// Implication constructor.
    pub fn implies(lft: Formula, rgt: Formula) -> Self {
        Self::Implies(Box::new(lft), Box::new(rgt))
    }
    /// Logic term constructor.
    pub fn logic(term: Term) -> Self {
        Self::Logic(Box::new(term))
    }
    /// Box modality constructor.
    pub fn boxed(program: Program, post: Formula) -> Self {
        Self::Box(Box::new(program), Box::new(post))
    }

    /// Turns a term into a formula.
    ///
    /// - embedded formulas are unwrapped;
    /// - variables and vectors become [`Formula::Logic`];
    /// - other terms `t` become `t != 0`.
    pub fn from_term(term: Term) -> Self {
        match term {
            Term::Formula(f) => *f,
            Term::Var(_) | Term::Vector(_) | Term::Program(_) => Self::logic(term),
            term => Self::rel(term, Cmp::Ne, Term::int(0)),
        }
    }

    /// Negation of `self`, pushed inwards one level where possible.
    ///
    /// Relations have their comparator negated and double negations are removed. A logic term
    /// wrapping a composite term (application, formula, program) yields the negation of the
    /// formula it denotes. A logic term wrapping an atomic term or a vector is returned
    /// **unchanged**: callers that need the negation of a logic variable must build `v = 0`
    /// themselves.
    ///
    /// ```rust
    /// # use sldl::{formula, formula::Formula};
    /// let f = formula!((< (x: R) 3));
    /// assert_eq!(f.negation().to_string(), "x >= 3");
    /// let f = formula!((logic (+ (x: R) 1)));
    /// assert_eq!(f.negation().to_string(), "!(x + 1 != 0)");
    /// ```
    pub fn negation(&self) -> Self {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::Rel { lft, cmp, rgt } => Self::rel(lft.clone(), cmp.negate(), rgt.clone()),
            Self::Not(f) => (**f).clone(),
            Self::Logic(inner) if inner.is_operator() => {
                Self::not(Self::from_term((**inner).clone()))
            }
            Self::Logic(_) => self.clone(),
            Self::And(_) | Self::Or(_) | Self::Implies(_, _) | Self::Box(_, _) => {
                Self::not(self.clone())
            }
        }
    }

    /// Top-level conjuncts of `self`, `true` has none.
    pub fn conjuncts(&self) -> Vec<&Formula> {
        let mut res = vec![];
        self.push_conjuncts(&mut res);
        res
    }
    fn push_conjuncts<'a>(&'a self, res: &mut Vec<&'a Formula>) {
        match self {
            Self::True => (),
            Self::And(fs) => fs.iter().for_each(|f| f.push_conjuncts(res)),
            Self::Logic(inner) => match &**inner {
                Term::Formula(f) => f.push_conjuncts(res),
                _ => res.push(self),
            },
            _ => res.push(self),
        }
    }

    /// Evaluates a formula under a valuation of its variables.
    ///
    /// `None` if some variable has no value, or on modalities.
    pub fn eval(&self, val: &dyn Fn(&Var) -> Option<Rat>) -> Option<bool> {
        match self {
            Self::True => Some(true),
            Self::False => Some(false),
            Self::Rel { lft, cmp, rgt } => Some(cmp.eval(&lft.eval(val)?, &rgt.eval(val)?)),
            Self::And(fs) => {
                let mut res = true;
                for f in fs {
                    res = f.eval(val)? && res;
                }
                Some(res)
            }
            Self::Or(fs) => {
                let mut res = false;
                for f in fs {
                    res = f.eval(val)? || res;
                }
                Some(res)
            }
            Self::Not(f) => f.eval(val).map(|b| !b),
            Self::Implies(lft, rgt) => Some(!lft.eval(val)? || rgt.eval(val)?),
            Self::Logic(inner) => match &**inner {
                Term::Formula(f) => f.eval(val),
                term => term.eval(val).map(|r| !r.is_zero()),
            },
            Self::Box(_, _) => None,
        }
    }

    /// Binding strength, used for parenthesizing.
    pub(crate) fn prec(&self) -> u8 {
        match self {
            Self::Implies(_, _) => 1,
            Self::Or(_) => 2,
            Self::And(_) => 3,
            Self::Not(_) | Self::Box(_, _) => 4,
            Self::Logic(inner) => match &**inner {
                Term::Formula(f) => f.prec(),
                _ => 5,
            },
            Self::True | Self::False | Self::Rel { .. } => 5,
        }
    }

    /// Turns a logic term into the formula it denotes after a substitution changed it.
    fn normalize_logic(&mut self) {
        if let Self::Logic(inner) = self {
            if !matches!(**inner, Term::Var(_) | Term::Vector(_)) {
                let inner = std::mem::replace(inner.as_mut(), Term::int(0));
                *self = Self::from_term(inner);
            }
        }
    }
}

impl Node for Formula {
    fn contains_term(&self, target: &Term) -> bool {
        if let Term::Formula(f) = target {
            if **f == *self {
                return true;
            }
        }
        match self {
            Self::True | Self::False => false,
            Self::Rel { lft, rgt, .. } => lft.contains_term(target) || rgt.contains_term(target),
            Self::And(fs) | Self::Or(fs) => fs.iter().any(|f| f.contains_term(target)),
            Self::Not(f) => f.contains_term(target),
            Self::Implies(lft, rgt) => lft.contains_term(target) || rgt.contains_term(target),
            Self::Logic(inner) => inner.contains_term(target),
            Self::Box(p, post) => p.contains_term(target) || post.contains_term(target),
        }
    }

    fn subst(&mut self, target: &Term, by: &Term, res: &mut Substitution) {
        if let Term::Formula(f) = target {
            if **f == *self {
                *self = Self::from_term(by.clone());
                res.count += 1;
                return;
            }
        }
        match self {
            Self::True | Self::False => (),
            Self::Rel { lft, rgt, .. } => {
                lft.subst(target, by, res);
                rgt.subst(target, by, res);
            }
            Self::And(fs) | Self::Or(fs) => {
                for f in fs.iter_mut() {
                    f.subst(target, by, res)
                }
            }
            Self::Not(f) => f.subst(target, by, res),
            Self::Implies(lft, rgt) => {
                lft.subst(target, by, res);
                rgt.subst(target, by, res);
            }
            Self::Logic(inner) => {
                let before = res.count;
                inner.subst(target, by, res);
                if res.count > before {
                    self.normalize_logic()
                }
            }
            Self::Box(p, post) => {
                p.subst(target, by, res);
                post.subst(target, by, res);
            }
        }
    }

    fn visit_leaves(&self, f: &mut dyn FnMut(&Term)) {
        match self {
            Self::True | Self::False => (),
            Self::Rel { lft, rgt, .. } => {
                lft.visit_leaves(f);
                rgt.visit_leaves(f);
            }
            Self::And(fs) | Self::Or(fs) => fs.iter().for_each(|sub| sub.visit_leaves(f)),
            Self::Not(sub) => sub.visit_leaves(f),
            Self::Implies(lft, rgt) => {
                lft.visit_leaves(f);
                rgt.visit_leaves(f);
            }
            Self::Logic(inner) => inner.visit_leaves(f),
            Self::Box(p, post) => {
                p.visit_leaves(f);
                post.visit_leaves(f);
            }
        }
    }
}

/// Packs basic trait implementations.
mod trait_impls {
    use super::*;

    fn write_sub(fmt: &mut fmt::Formatter, f: &Formula, parens: bool) -> fmt::Result {
        use std::fmt::Display;
        if parens {
            write!(fmt, "({})", f)
        } else {
            f.fmt(fmt)
        }
    }

    impl fmt::Display for Formula {
        fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
            match self {
                Self::True => write!(fmt, "true"),
                Self::False => write!(fmt, "false"),
                Self::Rel { lft, cmp, rgt } => write!(fmt, "{} {} {}", lft, cmp, rgt),
                Self::And(fs) | Self::Or(fs) => {
                    let (sep, prec) = if matches!(self, Self::And(_)) {
                        (" & ", 3)
                    } else {
                        (" | ", 2)
                    };
                    for (idx, f) in fs.iter().enumerate() {
                        if idx > 0 {
                            write!(fmt, "{}", sep)?
                        }
                        write_sub(fmt, f, f.prec() <= prec)?
                    }
                    Ok(())
                }
                Self::Not(f) => {
                    write!(fmt, "!")?;
                    write_sub(fmt, f, !matches!(**f, Self::True | Self::False | Self::Not(_)))
                }
                Self::Implies(lft, rgt) => {
                    write_sub(fmt, lft, lft.prec() <= 1)?;
                    write!(fmt, " -> ")?;
                    write_sub(fmt, rgt, rgt.prec() < 1)
                }
                Self::Logic(inner) => match &**inner {
                    Term::Formula(f) => f.fmt(fmt),
                    term => write!(fmt, "{} != 0", term),
                },
                Self::Box(p, post) => {
                    write!(fmt, "[{}]", p)?;
                    write_sub(fmt, post, post.prec() < 4)
                }
            }
        }
    }

    impl From<bool> for Formula {
        fn from(b: bool) -> Self {
            if b {
                Self::True
            } else {
                Self::False
            }
        }
    }
}
