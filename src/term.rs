//! Terms: the arithmetic side of the expression tree.
//!
//! A [`Term`] is either a leaf (variable, constant, literal), a vector of terms, an operator
//! application, or an embedded [`Formula`]/[`Program`]. Embedding the two other families lets
//! substitution work uniformly over the whole tree: the target and the replacement of
//! [`Node::replace_term_recursive`] are always terms.
//!
//! # Variables are shared
//!
//! A [`Var`] denotes a single system signal. Cloning a variable, or deep-copying a term that
//! mentions it, yields a handle to the **same** underlying instance. Equality stays structural
//! though: two variables are equal iff they have the same type and name.

crate::prelude!();

use num::ToPrimitive;


/// Type of a variable.
///
/// dL programs only manipulate reals, booleans are encoded as `0`/`1` or as relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Typ {
    /// Real type, `R` in dL.
    Real,
}
impl fmt::Display for Typ {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Real => write!(fmt, "R"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct VarInfo {
    typ: Typ,
    name: String,
}

/// A program variable.
///
/// Handle to a shared variable instance, see the [module-level documentation](self).
#[derive(Debug, Clone)]
pub struct Var {
    info: Rc<VarInfo>,
}
impl Var {
    /// Constructor.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use sldl::term::{Var, Typ};
    /// let var = Var::new("v_1", Typ::Real);
    /// assert_eq!(var.name(), "v_1");
    /// assert_eq!(var.ident(), "R:v_1");
    /// ```
    pub fn new(name: impl Into<String>, typ: Typ) -> Self {
        Self {
            info: Rc::new(VarInfo {
                typ,
                name: name.into(),
            }),
        }
    }
    /// Real variable constructor.
    pub fn real(name: impl Into<String>) -> Self {
        Self::new(name, Typ::Real)
    }

    /// Name accessor.
    pub fn name(&self) -> &str {
        &self.info.name
    }
    /// Type accessor.
    pub fn typ(&self) -> Typ {
        self.info.typ
    }
    /// Deterministic identifier, derived from the type and the name.
    pub fn ident(&self) -> String {
        format!("{}:{}", self.info.typ, self.info.name)
    }

    /// True if `self` and `other` are handles to the same instance.
    pub fn same_instance(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.info, &other.info)
    }

    /// Scalar component `index` (starting at `1`) of a vector-valued variable.
    ///
    /// ```rust
    /// # use sldl::term::Var;
    /// let var = Var::real("speed");
    /// assert_eq!(var.component(2).name(), "speed2");
    /// ```
    pub fn component(&self, index: usize) -> Self {
        Self::new(format!("{}{}", self.info.name, index), self.info.typ)
    }
}
impl PartialEq for Var {
    fn eq(&self, other: &Self) -> bool {
        self.same_instance(other) || self.info == other.info
    }
}
impl Eq for Var {}
impl std::hash::Hash for Var {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.info.hash(state)
    }
}
impl PartialOrd for Var {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Var {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.info.cmp(&other.info)
    }
}
impl fmt::Display for Var {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        self.info.name.fmt(fmt)
    }
}

/// A constant, *i.e.* a nullary function symbol of the `Functions` section.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Constant {
    name: String,
    value: Option<Rat>,
}
impl Constant {
    /// Constructor for an uninterpreted constant.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }
    /// Constructor for a defined constant.
    pub fn with_value(name: impl Into<String>, value: impl Into<Rat>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    /// Name accessor.
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Value accessor.
    pub fn value(&self) -> Option<&Rat> {
        self.value.as_ref()
    }
}
impl fmt::Display for Constant {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}()", self.name)
    }
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// N-ary addition.
    Add,
    /// N-ary subtraction, left-associative.
    Sub,
    /// N-ary multiplication.
    Mul,
    /// N-ary division, left-associative.
    Div,
    /// Binary power.
    Pow,
    /// Unary negation.
    Neg,
}
impl Op {
    /// Binding strength, higher binds tighter.
    fn prec(self) -> u8 {
        match self {
            Self::Add | Self::Sub => 1,
            Self::Mul | Self::Div => 2,
            Self::Neg => 3,
            Self::Pow => 4,
        }
    }

    /// Evaluates an application of `self`.
    ///
    /// `None` on division by zero, on a non-integer exponent, or on an arity error.
    pub fn eval(self, mut args: Vec<Rat>) -> Option<Rat> {
        match self {
            Self::Add => Some(args.into_iter().fold(Rat::zero(), |acc, r| acc + r)),
            Self::Mul => Some(args.into_iter().fold(Rat::one(), |acc, r| acc * r)),
            Self::Neg if args.len() == 1 => args.pop().map(|r| -r),
            Self::Sub if args.len() == 1 => args.pop().map(|r| -r),
            Self::Sub => {
                let mut args = args.into_iter();
                let first = args.next()?;
                Some(args.fold(first, |acc, r| acc - r))
            }
            Self::Div => {
                let mut args = args.into_iter();
                let mut res = args.next()?;
                for r in args {
                    if r.is_zero() {
                        return None;
                    }
                    res = res / r;
                }
                Some(res)
            }
            Self::Pow if args.len() == 2 => {
                let exp = args.pop()?;
                let base = args.pop()?;
                if !exp.is_integer() {
                    return None;
                }
                let exp = exp.to_integer().to_i32()?;
                if exp < 0 && base.is_zero() {
                    return None;
                }
                Some(base.pow(exp))
            }
            Self::Neg | Self::Pow => None,
        }
    }
}
impl fmt::Display for Op {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Add => write!(fmt, "+"),
            Self::Sub | Self::Neg => write!(fmt, "-"),
            Self::Mul => write!(fmt, "*"),
            Self::Div => write!(fmt, "/"),
            Self::Pow => write!(fmt, "^"),
        }
    }
}

/// An ordered sequence of terms.
///
/// An *expanded* vector is the result of expanding a term against a vector placeholder: item `i`
/// is the term specialized to component `i`. Substituting a vector into an expanded vector of the
/// same width is done index-wise (item `i` receives component `i`), never by nesting the whole
/// replacement into each item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorTerm {
    items: Vec<Term>,
    expanded: bool,
}
impl VectorTerm {
    /// Plain vector constructor.
    pub fn new(items: Vec<Term>) -> Self {
        Self {
            items,
            expanded: false,
        }
    }
    /// Expanded vector constructor.
    pub fn expanded(items: Vec<Term>) -> Self {
        Self {
            items,
            expanded: true,
        }
    }

    /// True if the vector is expanded.
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }
    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }
    /// True if the vector has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
    /// Items accessor.
    pub fn items(&self) -> &[Term] {
        &self.items
    }
    /// Mutable items accessor.
    pub fn items_mut(&mut self) -> &mut Vec<Term> {
        &mut self.items
    }
    /// Item accessor.
    pub fn get(&self, index: usize) -> Option<&Term> {
        self.items.get(index)
    }
    /// Moves the items out.
    pub fn into_items(self) -> Vec<Term> {
        self.items
    }

    /// Resizes the vector, padding with copies of `fill`.
    pub fn resize(&mut self, width: usize, fill: &Term) {
        self.items.resize(width, fill.clone())
    }

    /// Index-wise substitution, only legal on expanded vectors.
    fn subst_pairwise(&mut self, target: &Term, by: &Term, res: &mut Substitution) {
        let by_items = match by {
            Term::Vector(by) => &by.items,
            _ => {
                // Scalar replacement, same in every item.
                for item in self.items.iter_mut() {
                    item.subst(target, by, res)
                }
                return;
            }
        };

        let mentioned = match target {
            Term::Vector(target) => self
                .items
                .iter()
                .zip(target.items.iter())
                .any(|(item, target)| item.contains_term(target)),
            _ => self.items.iter().any(|item| item.contains_term(target)),
        };
        if !mentioned {
            return;
        }

        if by_items.len() != self.items.len() {
            res.fail(ErrorKind::SizeMismatch(self.items.len(), by_items.len()));
            return;
        }

        match target {
            Term::Vector(target) if target.len() != by_items.len() => {
                res.fail(ErrorKind::SizeMismatch(target.len(), by_items.len()))
            }
            Term::Vector(target) => {
                for ((item, target), by) in self.items.iter_mut().zip(&target.items).zip(by_items) {
                    item.subst(target, by, res)
                }
            }
            _ => {
                for (item, by) in self.items.iter_mut().zip(by_items) {
                    item.subst(target, by, res)
                }
            }
        }
    }
}

/// The expression-tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// A program variable.
    Var(Var),
    /// A constant.
    Cst(Constant),
    /// A literal.
    Real(Rat),
    /// A vector of terms, possibly expanded.
    Vector(VectorTerm),
    /// An operator application.
    App {
        /// The operator.
        op: Op,
        /// The arguments.
        args: Vec<Term>,
    },
    /// A formula.
    Formula(Box<Formula>),
    /// A hybrid program.
    Program(Box<Program>),
}

impl Term {
    /// Variable constructor.
    pub fn var(var: Var) -> Self {
        Self::Var(var)
    }
    /// Constant constructor.
    pub fn cst(cst: Constant) -> Self {
        Self::Cst(cst)
    }
    /// Literal constructor.
    pub fn real(r: impl Into<Rat>) -> Self {
        Self::Real(r.into())
    }
    /// Integer literal constructor.
    pub fn int(i: i64) -> Self {
        Self::Real(Rat::from_integer(i.into()))
    }
    /// Plain vector constructor.
    pub fn vector(items: Vec<Term>) -> Self {
        Self::Vector(VectorTerm::new(items))
    }
    /// Expanded vector constructor.
    pub fn expanded(items: Vec<Term>) -> Self {
        Self::Vector(VectorTerm::expanded(items))
    }
    /// Operator application constructor.
    pub fn app(op: Op, args: Vec<Term>) -> Self {
        Self::App { op, args }
    }
    /// Binary application.
    pub fn binary(op: Op, lft: Term, rgt: Term) -> Self {
        Self::App {
            op,
            args: vec![lft, rgt],
        }
    }
    /// Formula embedding.
    pub fn formula(f: Formula) -> Self {
        Self::Formula(Box::new(f))
    }
    /// Program embedding.
    pub fn program(p: Program) -> Self {
        Self::Program(Box::new(p))
    }

    /// True on variables, constants and literals.
    pub fn is_atomic(&self) -> bool {
        match self {
            Self::Var(_) | Self::Cst(_) | Self::Real(_) => true,
            Self::Vector(_) | Self::App { .. } | Self::Formula(_) | Self::Program(_) => false,
        }
    }
    /// True on composite nodes: applications, formulas and programs.
    pub fn is_operator(&self) -> bool {
        match self {
            Self::App { .. } | Self::Formula(_) | Self::Program(_) => true,
            Self::Var(_) | Self::Cst(_) | Self::Real(_) | Self::Vector(_) => false,
        }
    }
    /// True on expanded vectors.
    pub fn is_expanded(&self) -> bool {
        matches!(self, Self::Vector(vec) if vec.is_expanded())
    }

    /// Width of the signal this term denotes.
    pub fn width(&self) -> usize {
        match self {
            Self::Vector(vec) => vec.len(),
            Self::App { args, .. } => args.iter().map(Term::width).max().unwrap_or(1),
            _ => 1,
        }
    }

    /// Variable accessor.
    pub fn as_var(&self) -> Option<&Var> {
        match self {
            Self::Var(var) => Some(var),
            _ => None,
        }
    }
    /// Vector accessor.
    pub fn as_vector(&self) -> Option<&VectorTerm> {
        match self {
            Self::Vector(vec) => Some(vec),
            _ => None,
        }
    }

    /// Scalar component `index` (starting at `0`) of a vector-valued term.
    ///
    /// Scalars are broadcast, as are vectors of width one. Applications are projected
    /// argument-wise. `None` if `index` is out of range for some vector.
    ///
    /// ```rust
    /// # use sldl::term;
    /// let t = term!((* 2 (vec (a: R) (b: R))));
    /// assert_eq!(t.vector_entry(1).unwrap().to_string(), "2 * b");
    /// assert!(t.vector_entry(2).is_none());
    /// ```
    pub fn vector_entry(&self, index: usize) -> Option<Term> {
        match self {
            Self::Vector(vec) if vec.len() == 1 => vec.get(0).cloned(),
            Self::Vector(vec) => vec.get(index).cloned(),
            Self::App { op, args } => {
                let args: Option<Vec<Term>> =
                    args.iter().map(|arg| arg.vector_entry(index)).collect();
                Some(Self::app(*op, args?))
            }
            Self::Var(_) | Self::Cst(_) | Self::Real(_) | Self::Formula(_) | Self::Program(_) => {
                Some(self.clone())
            }
        }
    }

    /// Expands `self` into an expanded vector of `width` copies.
    ///
    /// Expanding an already expanded vector of the same width is the identity.
    pub fn expand(&self, width: usize) -> Term {
        match self {
            Self::Vector(vec) if vec.is_expanded() && vec.len() == width => self.clone(),
            _ => Self::expanded(vec![self.clone(); width]),
        }
    }

    /// Evaluates a term under a valuation of its variables.
    ///
    /// Defined constants evaluate to their value.
    pub fn eval(&self, val: &dyn Fn(&Var) -> Option<Rat>) -> Option<Rat> {
        match self {
            Self::Var(var) => val(var),
            Self::Cst(cst) => cst.value().cloned(),
            Self::Real(r) => Some(r.clone()),
            Self::App { op, args } => {
                let args: Option<Vec<Rat>> = args.iter().map(|arg| arg.eval(val)).collect();
                op.eval(args?)
            }
            Self::Vector(_) | Self::Formula(_) | Self::Program(_) => None,
        }
    }

    /// Binding strength, used for parenthesizing.
    fn prec(&self) -> u8 {
        match self {
            Self::Real(r) if r.is_negative() => 3,
            Self::App { op: Op::Sub, args } if args.len() == 1 => Op::Neg.prec(),
            Self::Real(r) if !r.is_integer() && !has_decimal_form(r) => 2,
            Self::App { op, .. } => op.prec(),
            _ => 9,
        }
    }
}

/// Outcome of a substitution.
#[derive(Debug, Default)]
pub struct Substitution {
    /// Number of replacements performed.
    pub count: usize,
    /// Errors, each one aborted the substitution of the subterm it was raised on.
    pub errors: Vec<Error>,
}
impl Substitution {
    /// True if no error occurred.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
    /// Registers an error.
    pub fn fail(&mut self, err: impl Into<Error>) {
        self.errors.push(err.into())
    }
    /// Merges another substitution outcome into `self`.
    pub fn merge(&mut self, other: Substitution) {
        self.count += other.count;
        self.errors.extend(other.errors)
    }
}

/// Operations shared by all the nodes of the expression tree.
pub trait Node {
    /// True if `target` occurs in `self`, by structural equality.
    fn contains_term(&self, target: &Term) -> bool;

    /// Replaces all occurrences of `target` by `by`, top-down.
    ///
    /// A node equal to `target` is replaced wholesale and its replacement is not searched.
    /// Errors do not stop the traversal, they are recorded in `res`.
    fn subst(&mut self, target: &Term, by: &Term, res: &mut Substitution);

    /// Applies `f` to all the leaves (variables, constants, literals) of `self`.
    fn visit_leaves(&self, f: &mut dyn FnMut(&Term));

    /// Replaces all occurrences of `target` by `by`, see [`Node::subst`].
    fn replace_term_recursive(&mut self, target: &Term, by: &Term) -> Substitution {
        let mut res = Substitution::default();
        self.subst(target, by, &mut res);
        res
    }

    /// Independent copy of `self`.
    ///
    /// Variables are not duplicated: the copy shares them with the original.
    fn create_deep_copy(&self) -> Self
    where
        Self: Clone,
    {
        self.clone()
    }

    /// Collects the variables of `self`, in order of appearance.
    fn collect_vars(&self, vars: &mut IndexSet<Var>) {
        self.visit_leaves(&mut |leaf| {
            if let Term::Var(var) = leaf {
                vars.insert(var.clone());
            }
        })
    }

    /// Collects the constants of `self`, in order of appearance.
    fn collect_csts(&self, csts: &mut IndexSet<Constant>) {
        self.visit_leaves(&mut |leaf| {
            if let Term::Cst(cst) = leaf {
                csts.insert(cst.clone());
            }
        })
    }
}

impl Node for Term {
    fn contains_term(&self, target: &Term) -> bool {
        if self == target {
            return true;
        }
        match self {
            Self::Var(_) | Self::Cst(_) | Self::Real(_) => false,
            Self::Vector(vec) => vec.items.iter().any(|item| item.contains_term(target)),
            Self::App { args, .. } => args.iter().any(|arg| arg.contains_term(target)),
            Self::Formula(f) => f.contains_term(target),
            Self::Program(p) => p.contains_term(target),
        }
    }

    fn subst(&mut self, target: &Term, by: &Term, res: &mut Substitution) {
        if self == target {
            *self = by.clone();
            res.count += 1;
            return;
        }
        match self {
            Self::Var(_) | Self::Cst(_) | Self::Real(_) => (),
            Self::Vector(vec) if vec.is_expanded() => vec.subst_pairwise(target, by, res),
            Self::Vector(vec) => {
                for item in vec.items.iter_mut() {
                    item.subst(target, by, res)
                }
            }
            Self::App { args, .. } => {
                for arg in args.iter_mut() {
                    arg.subst(target, by, res)
                }
            }
            Self::Formula(f) => f.subst(target, by, res),
            Self::Program(p) => p.subst(target, by, res),
        }
    }

    fn visit_leaves(&self, f: &mut dyn FnMut(&Term)) {
        match self {
            Self::Var(_) | Self::Cst(_) | Self::Real(_) => f(self),
            Self::Vector(vec) => vec.items.iter().for_each(|item| item.visit_leaves(f)),
            Self::App { args, .. } => args.iter().for_each(|arg| arg.visit_leaves(f)),
            Self::Formula(formula) => formula.visit_leaves(f),
            Self::Program(p) => p.visit_leaves(f),
        }
    }
}

/// True if `r` has a finite decimal representation.
fn has_decimal_form(r: &Rat) -> bool {
    decimal_digits(r).is_some()
}

/// Number of decimal digits needed to write `r` exactly, if any.
fn decimal_digits(r: &Rat) -> Option<usize> {
    let (two, five) = (Int::from(2u8), Int::from(5u8));
    let mut den = r.denom().clone();
    let (mut twos, mut fives) = (0, 0);
    while (&den % &two).is_zero() {
        den /= &two;
        twos += 1;
    }
    while (&den % &five).is_zero() {
        den /= &five;
        fives += 1;
    }
    if den.is_one() {
        Some(usize::max(twos, fives))
    } else {
        None
    }
}

/// Writes a rational in dL syntax: integers and finite decimals as such, `n/d` otherwise.
pub fn fmt_rat(r: &Rat, fmt: &mut fmt::Formatter) -> fmt::Result {
    if r.is_integer() {
        return write!(fmt, "{}", r.numer());
    }
    match decimal_digits(r) {
        Some(digits) => {
            let scaled = r * Rat::from_integer(num::pow(Int::from(10u8), digits));
            let abs = scaled.to_integer().abs().to_string();
            let abs = format!("{:0>width$}", abs, width = digits + 1);
            let (int, frac) = abs.split_at(abs.len() - digits);
            let sign = if r.is_negative() { "-" } else { "" };
            write!(fmt, "{}{}.{}", sign, int, frac)
        }
        None => write!(fmt, "{}/{}", r.numer(), r.denom()),
    }
}

/// Packs basic trait implementations.
mod trait_impls {
    use super::*;

    impl fmt::Display for Term {
        fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
            match self {
                Self::Var(var) => var.fmt(fmt),
                Self::Cst(cst) => cst.fmt(fmt),
                Self::Real(r) => fmt_rat(r, fmt),
                Self::Vector(vec) => {
                    write!(fmt, "(")?;
                    for (idx, item) in vec.items.iter().enumerate() {
                        if idx > 0 {
                            write!(fmt, ", ")?
                        }
                        item.fmt(fmt)?
                    }
                    write!(fmt, ")")
                }
                Self::App { op: Op::Neg, args } | Self::App { op: Op::Sub, args }
                    if args.len() == 1 =>
                {
                    write!(fmt, "-")?;
                    write_arg(fmt, &args[0], args[0].prec() <= Op::Neg.prec())
                }
                Self::App { op: Op::Pow, args } if args.len() == 2 => {
                    write_arg(fmt, &args[0], args[0].prec() <= Op::Pow.prec())?;
                    write!(fmt, "^")?;
                    write_arg(fmt, &args[1], args[1].prec() < 9)
                }
                Self::App { op, args } => {
                    let prec = op.prec();
                    for (idx, arg) in args.iter().enumerate() {
                        if idx == 0 {
                            write_arg(fmt, arg, arg.prec() < prec)?
                        } else {
                            write!(fmt, " {} ", op)?;
                            let non_assoc = matches!(op, Op::Sub | Op::Div) && arg.prec() == prec;
                            let negated = arg.prec() == Op::Neg.prec();
                            write_arg(fmt, arg, arg.prec() < prec || non_assoc || negated)?
                        }
                    }
                    Ok(())
                }
                Self::Formula(f) => f.fmt(fmt),
                Self::Program(p) => p.fmt(fmt),
            }
        }
    }

    fn write_arg(fmt: &mut fmt::Formatter, arg: &Term, parens: bool) -> fmt::Result {
        use std::fmt::Display;
        if parens {
            write!(fmt, "({})", arg)
        } else {
            arg.fmt(fmt)
        }
    }

    impl From<Var> for Term {
        fn from(var: Var) -> Self {
            Self::Var(var)
        }
    }
    impl From<Constant> for Term {
        fn from(cst: Constant) -> Self {
            Self::Cst(cst)
        }
    }
    impl From<Rat> for Term {
        fn from(r: Rat) -> Self {
            Self::Real(r)
        }
    }
    impl From<i32> for Term {
        fn from(i: i32) -> Self {
            Self::int(i.into())
        }
    }
    impl From<i64> for Term {
        fn from(i: i64) -> Self {
            Self::int(i)
        }
    }
    impl From<usize> for Term {
        fn from(n: usize) -> Self {
            Self::Real(Rat::from_integer(n.into()))
        }
    }
    impl From<(i64, i64)> for Term {
        fn from((num, den): (i64, i64)) -> Self {
            Self::Real(Rat::new(num.into(), den.into()))
        }
    }
    impl From<Formula> for Term {
        fn from(f: Formula) -> Self {
            Self::formula(f)
        }
    }
    impl From<Program> for Term {
        fn from(p: Program) -> Self {
            Self::program(p)
        }
    }
}
