//! Hybrid programs.

crate::prelude!();

#[cfg(test)]
mod test;

/// An ordinary differential equation `var' = rhs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ode {
    /// Differentiated variable.
    pub var: Var,
    /// Right-hand side.
    pub rhs: Term,
}
impl Ode {
    /// Constructor.
    pub fn new(var: Var, rhs: Term) -> Self {
        Self { var, rhs }
    }
}
impl fmt::Display for Ode {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}' = {}", self.var, self.rhs)
    }
}

/// A continuous evolution: a system of ODEs and an evolution domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evolution {
    /// The ODEs, evolving simultaneously.
    pub odes: Vec<Ode>,
    /// Evolution domain constraint.
    pub domain: Formula,
}
impl Evolution {
    /// Constructor.
    pub fn new(odes: Vec<Ode>, domain: Formula) -> Self {
        Self { odes, domain }
    }

    /// Conjuncts of the domain.
    pub fn domain_conjuncts(&self) -> Vec<&Formula> {
        self.domain.conjuncts()
    }

    fn subst(&mut self, target: &Term, by: &Term, res: &mut Substitution) {
        for ode in self.odes.iter_mut() {
            subst_var(&mut ode.var, target, by, res);
            ode.rhs.subst(target, by, res);
        }
        self.domain.subst(target, by, res)
    }
    fn contains_term(&self, target: &Term) -> bool {
        self.odes.iter().any(|ode| {
            target.as_var() == Some(&ode.var) || ode.rhs.contains_term(target)
        }) || self.domain.contains_term(target)
    }
    fn visit_leaves(&self, f: &mut dyn FnMut(&Term)) {
        for ode in &self.odes {
            f(&Term::Var(ode.var.clone()));
            ode.rhs.visit_leaves(f);
        }
        self.domain.visit_leaves(f)
    }
}
impl fmt::Display for Evolution {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{{")?;
        for (idx, ode) in self.odes.iter().enumerate() {
            if idx > 0 {
                write!(fmt, ", ")?
            }
            ode.fmt(fmt)?
        }
        if self.domain != Formula::True {
            write!(fmt, " & {}", self.domain)?
        }
        write!(fmt, "}}")
    }
}

/// An evolution guarded by an activation condition.
///
/// The condition is conjoined to the evolution domain when rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvolutionContainer {
    /// The evolution.
    pub evolution: Evolution,
    /// Activation condition.
    pub condition: Formula,
}
impl EvolutionContainer {
    /// Constructor.
    pub fn new(evolution: Evolution, condition: Formula) -> Self {
        Self {
            evolution,
            condition,
        }
    }

    /// The evolution this container actually stands for.
    pub fn to_evolution(&self) -> Evolution {
        let mut domain: Vec<Formula> = self
            .evolution
            .domain_conjuncts()
            .into_iter()
            .cloned()
            .collect();
        domain.extend(self.condition.conjuncts().into_iter().cloned());
        Evolution::new(self.evolution.odes.clone(), Formula::and(domain))
    }

    fn subst(&mut self, target: &Term, by: &Term, res: &mut Substitution) {
        match target {
            Term::Program(p) if matches!(&**p, Program::Evolution(e) if *e == self.evolution) => {
                match by {
                    Term::Program(by) => match &**by {
                        Program::Evolution(by) => {
                            self.evolution = by.clone();
                            res.count += 1;
                        }
                        _ => res.fail(format!("cannot replace evolution `{}` by `{}`", p, by)),
                    },
                    _ => res.fail(format!("cannot replace evolution `{}` by `{}`", p, by)),
                }
            }
            _ => self.evolution.subst(target, by, res),
        }
        match target {
            Term::Formula(f) if **f == self.condition => {
                self.condition = Formula::from_term(by.clone());
                res.count += 1;
            }
            _ => self.condition.subst(target, by, res),
        }
    }
    fn contains_term(&self, target: &Term) -> bool {
        match target {
            Term::Program(p) if matches!(&**p, Program::Evolution(e) if *e == self.evolution) => {
                return true
            }
            Term::Formula(f) if **f == self.condition => return true,
            _ => (),
        }
        self.evolution.contains_term(target) || self.condition.contains_term(target)
    }
}

/// A hybrid program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Program {
    /// Deterministic assignment `var := term;`.
    Assign {
        /// Assigned variable.
        var: Var,
        /// Assigned term.
        term: Term,
    },
    /// Nondeterministic assignment `var := *;`.
    AssignAny(Var),
    /// Test `?f;`.
    Test(Formula),
    /// Continuous evolution.
    Evolution(Evolution),
    /// Guarded continuous evolution.
    Container(EvolutionContainer),
    /// Nondeterministic choice.
    Choice(Vec<Program>),
    /// Sequential composition.
    Seq(Vec<Program>),
    /// Nondeterministic repetition.
    Loop(Box<Program>),
}

impl Program {
    /// Assignment constructor.
    pub fn assign(var: Var, term: impl Into<Term>) -> Self {
        Self::Assign {
            var,
            term: term.into(),
        }
    }
    /// Nondeterministic assignment constructor.
    pub fn assign_any(var: Var) -> Self {
        Self::AssignAny(var)
    }
    /// Test constructor.
    pub fn test(f: Formula) -> Self {
        Self::Test(f)
    }
    /// Choice constructor, a single alternative is returned as is.
    pub fn choice(mut alts: Vec<Program>) -> Self {
        if alts.len() == 1 {
            if let Some(alt) = alts.pop() {
                return alt;
            }
        }
        Self::Choice(alts)
    }
    /// Sequence constructor, a single element is returned as is.
    pub fn seq(mut seq: Vec<Program>) -> Self {
        if seq.len() == 1 {
            if let Some(p) = seq.pop() {
                return p;
            }
        }
        Self::Seq(seq)
    }
    /// Repetition constructor.
    pub fn repeat(body: Program) -> Self {
        Self::Loop(Box::new(body))
    }
}

/// Handles an occurrence of a variable in a binding position: only variables can replace it.
fn subst_var(var: &mut Var, target: &Term, by: &Term, res: &mut Substitution) {
    if target.as_var() == Some(var) {
        match by {
            Term::Var(by) => {
                *var = by.clone();
                res.count += 1;
            }
            _ => res.fail(format!("cannot bind `{}` to non-variable `{}`", var, by)),
        }
    }
}

impl Node for Program {
    fn contains_term(&self, target: &Term) -> bool {
        if let Term::Program(p) = target {
            if **p == *self {
                return true;
            }
        }
        match self {
            Self::Assign { var, term } => {
                target.as_var() == Some(var) || term.contains_term(target)
            }
            Self::AssignAny(var) => target.as_var() == Some(var),
            Self::Test(f) => f.contains_term(target),
            Self::Evolution(e) => e.contains_term(target),
            Self::Container(c) => c.contains_term(target),
            Self::Choice(ps) | Self::Seq(ps) => ps.iter().any(|p| p.contains_term(target)),
            Self::Loop(p) => p.contains_term(target),
        }
    }

    fn subst(&mut self, target: &Term, by: &Term, res: &mut Substitution) {
        if let Term::Program(p) = target {
            if **p == *self {
                match by {
                    Term::Program(by) => {
                        *self = (**by).clone();
                        res.count += 1;
                    }
                    _ => res.fail(format!("cannot replace program `{}` by term `{}`", p, by)),
                }
                return;
            }
        }
        match self {
            Self::Assign { var, term } => {
                subst_var(var, target, by, res);
                term.subst(target, by, res);
            }
            Self::AssignAny(var) => subst_var(var, target, by, res),
            Self::Test(f) => f.subst(target, by, res),
            Self::Evolution(e) => e.subst(target, by, res),
            Self::Container(c) => c.subst(target, by, res),
            Self::Choice(ps) | Self::Seq(ps) => {
                for p in ps.iter_mut() {
                    p.subst(target, by, res)
                }
            }
            Self::Loop(p) => p.subst(target, by, res),
        }
    }

    fn visit_leaves(&self, f: &mut dyn FnMut(&Term)) {
        match self {
            Self::Assign { var, term } => {
                f(&Term::Var(var.clone()));
                term.visit_leaves(f);
            }
            Self::AssignAny(var) => f(&Term::Var(var.clone())),
            Self::Test(formula) => formula.visit_leaves(f),
            Self::Evolution(e) => e.visit_leaves(f),
            Self::Container(c) => {
                c.evolution.visit_leaves(f);
                c.condition.visit_leaves(f);
            }
            Self::Choice(ps) | Self::Seq(ps) => ps.iter().for_each(|p| p.visit_leaves(f)),
            Self::Loop(p) => p.visit_leaves(f),
        }
    }
}

/// Packs basic trait implementations.
mod trait_impls {
    use super::*;

    impl fmt::Display for Program {
        fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
            match self {
                Self::Assign { var, term } => write!(fmt, "{} := {};", var, term),
                Self::AssignAny(var) => write!(fmt, "{} := *;", var),
                Self::Test(f) => write!(fmt, "?{};", f),
                Self::Evolution(e) => e.fmt(fmt),
                Self::Container(c) => c.to_evolution().fmt(fmt),
                Self::Choice(alts) => {
                    write!(fmt, "{{ ")?;
                    for (idx, alt) in alts.iter().enumerate() {
                        if idx > 0 {
                            write!(fmt, " ++ ")?
                        }
                        alt.fmt(fmt)?
                    }
                    write!(fmt, " }}")
                }
                Self::Seq(seq) => {
                    for (idx, p) in seq.iter().enumerate() {
                        if idx > 0 {
                            write!(fmt, " ")?
                        }
                        p.fmt(fmt)?
                    }
                    Ok(())
                }
                Self::Loop(body) => write!(fmt, "{{ {} }}*", body),
            }
        }
    }

    impl From<Evolution> for Program {
        fn from(e: Evolution) -> Self {
            Self::Evolution(e)
        }
    }
    impl From<EvolutionContainer> for Program {
        fn from(c: EvolutionContainer) -> Self {
            Self::Container(c)
        }
    }
}
