//! Transformers for the standard blocks, and for service blocks.
//!
//! Vector signals are handled component-wise: a block of width `n` contributes `n` scalar
//! statements, one per component.

crate::prelude!();

use super::{param, Contribution, Ctx};
use contract::{rules, Binding, Role};

/// Component `idx` of a signal.
fn component(term: &Term, idx: usize) -> Res<Term> {
    match term.vector_entry(idx) {
        Some(term) => Ok(term),
        None => bail!(ErrorKind::SizeMismatch(idx + 1, term.width())),
    }
}
/// Component `idx` of an output signal, must be a variable.
fn out_var(term: &Term, idx: usize) -> Res<Var> {
    match component(term, idx)? {
        Term::Var(var) => Ok(var),
        term => bail!("cannot assign to signal `{}`", term),
    }
}

/// Scalar or vector parameter, `default` if absent, its constants go to `c`.
fn param_value(ctx: &Ctx, c: &mut Contribution, key: &str, default: &str) -> Res<Term> {
    let raw = ctx.param(key).unwrap_or(default);
    let (term, csts) = param::value(raw)
        .chain_err(|| format!("in parameter `{}` of block `{}`", key, ctx.block.name))?;
    c.constants.extend(csts);
    Ok(term)
}

/// Optional bound parameter: absent, empty and infinite bounds are ignored.
fn bound_param(ctx: &Ctx, c: &mut Contribution, keys: &[&str]) -> Res<Option<Term>> {
    for key in keys {
        if let Some(raw) = ctx.param(key) {
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.trim_start_matches(['-', '+']) == "inf" {
                return Ok(None);
            }
            return param_value(ctx, c, key, "").map(Some);
        }
    }
    Ok(None)
}

fn rel(lft: Term, cmp: Cmp, rgt: Term) -> Formula {
    Formula::rel(lft, cmp, rgt)
}

/// `{ ?cond; then ++ ?!cond; else }`.
fn ite(cond: Formula, thn: Program, els: Program) -> Program {
    let neg = cond.negation();
    Program::choice(vec![
        Program::seq(vec![Program::test(cond), thn]),
        Program::seq(vec![Program::test(neg), els]),
    ])
}

/// Fallback for unmapped block types.
pub fn empty(ctx: &mut Ctx) -> Res<Contribution> {
    ctx.env.log.warn(format!(
        "block `{}`: no transformer for block type `{}`, block ignored",
        ctx.block.name, ctx.block.typ
    ));
    Ok(Contribution::new())
}

/// Structural blocks.
pub fn skip(ctx: &mut Ctx) -> Res<Contribution> {
    ctx.env.log.debug(format!(
        "block `{}`: structural block `{}` skipped",
        ctx.block.name, ctx.block.typ
    ));
    Ok(Contribution::new())
}

/// Model input: `y := *;` and its range, if any.
pub fn input(ctx: &mut Ctx) -> Res<Contribution> {
    let mut c = Contribution::new();
    let y = ctx.output(1)?;
    let min = bound_param(ctx, &mut c, &["Minimum", "OutMin"])?;
    let max = bound_param(ctx, &mut c, &["Maximum", "OutMax"])?;
    for idx in 0..y.width() {
        let y_i = out_var(&y, idx)?;
        c.behavior.push(Program::assign_any(y_i.clone()));
        let mut range = vec![];
        if let Some(min) = &min {
            range.push(rel(component(min, idx)?, Cmp::Le, Term::var(y_i.clone())))
        }
        if let Some(max) = &max {
            range.push(rel(Term::var(y_i.clone()), Cmp::Le, component(max, idx)?))
        }
        if !range.is_empty() {
            c.behavior.push(Program::test(Formula::and(range)))
        }
    }
    Ok(c)
}

/// Constant value, bound directly as the output signal.
pub fn constant(ctx: &mut Ctx) -> Res<Contribution> {
    let mut c = Contribution::new();
    let value = param_value(ctx, &mut c, "Value", "1")?;
    if ctx.env.is_bound(ctx.id, 1) {
        // Some consumer already reads a variable, assign it.
        let y = ctx.output(1)?;
        for idx in 0..y.width() {
            c.front
                .push(Program::assign(out_var(&y, idx)?, component(&value, idx)?))
        }
    } else {
        ctx.env.bind_signal(ctx.id, 1, value)?
    }
    Ok(c)
}

/// `y := K * u;`.
pub fn gain(ctx: &mut Ctx) -> Res<Contribution> {
    let mut c = Contribution::new();
    let k = param_value(ctx, &mut c, "Gain", "1")?;
    let u = ctx.input(1)?;
    let y = ctx.output(1)?;
    for idx in 0..y.width() {
        let rhs = Term::binary(Op::Mul, component(&k, idx)?, component(&u, idx)?);
        c.behavior.push(Program::assign(out_var(&y, idx)?, rhs))
    }
    Ok(c)
}

/// Folds signed operands with the operators for each sign.
fn fold_signed(operands: Vec<(bool, Term)>, pos: Op, neg: Op, unit: Term) -> Term {
    let mut acc: Option<Term> = None;
    for (sign, operand) in operands {
        acc = Some(match (acc, sign) {
            (None, true) => operand,
            (None, false) if neg == Op::Sub => Term::app(Op::Neg, vec![operand]),
            (None, false) => Term::binary(neg, unit.clone(), operand),
            (Some(acc), true) => Term::binary(pos, acc, operand),
            (Some(acc), false) => Term::binary(neg, acc, operand),
        })
    }
    acc.unwrap_or(unit)
}

/// Shared by sums and products.
fn signed_block(
    ctx: &mut Ctx,
    default: &str,
    chars: (char, char),
    ops: (Op, Op),
    unit: Term,
) -> Res<Contribution> {
    let mut c = Contribution::new();
    let signs = param::signs(ctx.param("Inputs").unwrap_or(default), chars.0, chars.1)
        .chain_err(|| format!("in parameter `Inputs` of block `{}`", ctx.block.name))?;
    let inputs = ctx.inputs()?;
    if signs.len() != inputs.len() {
        bail!(
            "block `{}` has {} input(s) but its `Inputs` parameter mentions {}",
            ctx.block.name,
            inputs.len(),
            signs.len()
        )
    }
    let y = ctx.output(1)?;

    // A single input of width `n` and a scalar output: combine the elements.
    if let [input] = inputs.as_slice() {
        if input.width() > 1 && y.width() == 1 {
            let operands = (0..input.width())
                .map(|idx| component(input, idx).map(|item| (signs[0], item)))
                .collect::<Res<Vec<_>>>()?;
            let rhs = fold_signed(operands, ops.0, ops.1, unit);
            c.behavior.push(Program::assign(out_var(&y, 0)?, rhs));
            return Ok(c);
        }
    }

    for idx in 0..y.width() {
        let operands = signs
            .iter()
            .zip(&inputs)
            .map(|(sign, input)| component(input, idx).map(|item| (*sign, item)))
            .collect::<Res<Vec<_>>>()?;
        let rhs = fold_signed(operands, ops.0, ops.1, unit.clone());
        c.behavior.push(Program::assign(out_var(&y, idx)?, rhs))
    }
    Ok(c)
}

/// Signed sum of the inputs.
pub fn sum(ctx: &mut Ctx) -> Res<Contribution> {
    signed_block(ctx, "++", ('+', '-'), (Op::Add, Op::Sub), Term::int(0))
}

/// Product and quotient of the inputs.
pub fn product(ctx: &mut Ctx) -> Res<Contribution> {
    signed_block(ctx, "2", ('*', '/'), (Op::Mul, Op::Div), Term::int(1))
}

/// Continuous integrator: `y' = u` with `y = x0` initially.
pub fn integrator(ctx: &mut Ctx) -> Res<Contribution> {
    let mut c = Contribution::new();
    let x0 = param_value(ctx, &mut c, "InitialCondition", "0")?;
    let upper = bound_param(ctx, &mut c, &["UpperSaturationLimit"])?;
    let lower = bound_param(ctx, &mut c, &["LowerSaturationLimit"])?;
    let u = ctx.input(1)?;
    let y = ctx.output(1)?;
    for idx in 0..y.width() {
        let y_i = out_var(&y, idx)?;
        c.odes.push(Ode::new(y_i.clone(), component(&u, idx)?));
        c.init
            .push(rel(Term::var(y_i.clone()), Cmp::Eq, component(&x0, idx)?));
        if let Some(upper) = &upper {
            c.domain
                .push(rel(Term::var(y_i.clone()), Cmp::Le, component(upper, idx)?))
        }
        if let Some(lower) = &lower {
            c.domain
                .push(rel(component(lower, idx)?, Cmp::Le, Term::var(y_i.clone())))
        }
    }
    Ok(c)
}

/// One-step delay through a state `s`: `y := s;` first, `s := u;` last.
pub fn unit_delay(ctx: &mut Ctx) -> Res<Contribution> {
    let mut c = Contribution::new();
    let x0 = param_value(ctx, &mut c, "InitialCondition", "0")?;
    let u = ctx.input(1)?;
    let y = ctx.output(1)?;
    let state = ctx
        .env
        .fresh_signal(&format!("{}_state", ctx.name()), y.width());
    for idx in 0..y.width() {
        let s_i = out_var(&state, idx)?;
        c.init
            .push(rel(Term::var(s_i.clone()), Cmp::Eq, component(&x0, idx)?));
        c.front
            .push(Program::assign(out_var(&y, idx)?, Term::var(s_i.clone())));
        c.back.push(Program::assign(s_i, component(&u, idx)?))
    }
    Ok(c)
}

/// Sample and hold: `y := u;`.
pub fn zero_order_hold(ctx: &mut Ctx) -> Res<Contribution> {
    let mut c = Contribution::new();
    let u = ctx.input(1)?;
    let y = ctx.output(1)?;
    for idx in 0..y.width() {
        c.behavior
            .push(Program::assign(out_var(&y, idx)?, component(&u, idx)?))
    }
    Ok(c)
}

/// Clamp to `[LowerLimit, UpperLimit]`.
pub fn saturation(ctx: &mut Ctx) -> Res<Contribution> {
    let mut c = Contribution::new();
    let hi = param_value(ctx, &mut c, "UpperLimit", "0.5")?;
    let lo = param_value(ctx, &mut c, "LowerLimit", "-0.5")?;
    let u = ctx.input(1)?;
    let y = ctx.output(1)?;
    for idx in 0..y.width() {
        let (u_i, y_i) = (component(&u, idx)?, out_var(&y, idx)?);
        let (lo_i, hi_i) = (component(&lo, idx)?, component(&hi, idx)?);
        c.behavior.push(Program::choice(vec![
            Program::seq(vec![
                Program::test(rel(u_i.clone(), Cmp::Gt, hi_i.clone())),
                Program::assign(y_i.clone(), hi_i.clone()),
            ]),
            Program::seq(vec![
                Program::test(rel(u_i.clone(), Cmp::Lt, lo_i.clone())),
                Program::assign(y_i.clone(), lo_i.clone()),
            ]),
            Program::seq(vec![
                Program::test(Formula::and(vec![
                    rel(lo_i, Cmp::Le, u_i.clone()),
                    rel(u_i.clone(), Cmp::Le, hi_i),
                ])),
                Program::assign(y_i, u_i),
            ]),
        ]))
    }
    Ok(c)
}

/// Passes the first input if the second one satisfies the criterion, the third one otherwise.
pub fn switch(ctx: &mut Ctx) -> Res<Contribution> {
    let mut c = Contribution::new();
    let criteria = ctx.param("Criteria").unwrap_or("u2 >= Threshold").trim();
    let cmp = match criteria {
        "u2 >= Threshold" => Some(Cmp::Ge),
        "u2 > Threshold" => Some(Cmp::Gt),
        "u2 ~= 0" => None,
        _ => bail!("block `{}`: unsupported criteria `{}`", ctx.block.name, criteria),
    };
    let threshold = match cmp {
        Some(_) => param_value(ctx, &mut c, "Threshold", "0")?,
        None => Term::int(0),
    };
    let (u1, u2, u3) = (ctx.input(1)?, ctx.input(2)?, ctx.input(3)?);
    let y = ctx.output(1)?;
    for idx in 0..y.width() {
        let ctl = component(&u2, idx)?;
        let cond = match cmp {
            Some(cmp) => rel(ctl, cmp, component(&threshold, idx)?),
            None => rel(ctl, Cmp::Ne, Term::int(0)),
        };
        let y_i = out_var(&y, idx)?;
        c.behavior.push(ite(
            cond,
            Program::assign(y_i.clone(), component(&u1, idx)?),
            Program::assign(y_i, component(&u3, idx)?),
        ))
    }
    Ok(c)
}

/// `y` is `1` if the relation between the inputs holds, `0` otherwise.
pub fn relational(ctx: &mut Ctx) -> Res<Contribution> {
    let c = Contribution::new();
    let op = ctx.param("Operator").unwrap_or("<=").trim();
    let cmp = match op {
        "==" => Cmp::Eq,
        "~=" | "!=" => Cmp::Ne,
        "<" => Cmp::Lt,
        "<=" => Cmp::Le,
        ">" => Cmp::Gt,
        ">=" => Cmp::Ge,
        _ => bail!("block `{}`: unsupported operator `{}`", ctx.block.name, op),
    };
    boolean_output(ctx, c, |inputs, idx| match inputs {
        [lft, rgt] => Ok(rel(component(lft, idx)?, cmp, component(rgt, idx)?)),
        _ => bail!("relational operators take two inputs, found {}", inputs.len()),
    })
}

/// `y` is `1` if the boolean combination of the inputs, read as `!= 0`, holds.
pub fn logic(ctx: &mut Ctx) -> Res<Contribution> {
    let c = Contribution::new();
    let op = ctx
        .param("Operator")
        .unwrap_or("AND")
        .trim()
        .to_uppercase();
    boolean_output(ctx, c, move |inputs, idx| {
        // Atoms are relations, not logic terms, so that they can be negated.
        let atoms = inputs
            .iter()
            .map(|input| Ok(rel(component(input, idx)?, Cmp::Ne, Term::int(0))))
            .collect::<Res<Vec<_>>>()?;
        let f = match op.as_str() {
            "AND" => Formula::and(atoms),
            "OR" => Formula::or(atoms),
            "NAND" => Formula::not(Formula::and(atoms)),
            "NOR" => Formula::not(Formula::or(atoms)),
            "XOR" => {
                let mut atoms = atoms.into_iter();
                let first = atoms.next().unwrap_or(Formula::False);
                atoms.fold(first, |acc, atom| {
                    Formula::or(vec![
                        Formula::and(vec![acc.clone(), atom.negation()]),
                        Formula::and(vec![acc.negation(), atom]),
                    ])
                })
            }
            "NOT" => match atoms.as_slice() {
                [atom] => atom.negation(),
                _ => bail!("NOT takes exactly one input, found {}", atoms.len()),
            },
            _ => bail!("unsupported logic operator `{}`", op),
        };
        Ok(f)
    })
}

/// Shared by relational and logic blocks.
fn boolean_output(
    ctx: &mut Ctx,
    mut c: Contribution,
    cond: impl Fn(&[Term], usize) -> Res<Formula>,
) -> Res<Contribution> {
    let inputs = ctx.inputs()?;
    let y = ctx.output(1)?;
    for idx in 0..y.width() {
        let f = cond(&inputs, idx)
            .chain_err(|| format!("while translating block `{}`", ctx.block.name))?;
        let y_i = out_var(&y, idx)?;
        c.behavior.push(ite(
            f,
            Program::assign(y_i.clone(), 1),
            Program::assign(y_i, 0),
        ))
    }
    Ok(c)
}

/// Service block, translated through its contract.
pub fn contract(ctx: &mut Ctx) -> Res<Contribution> {
    let req = contract::Request::new(ctx.graph, ctx.id);
    let rule = rules::select(&req.service)?;
    ctx.env.log.debug(format!(
        "block `{}`: service `{}` uses the {} contract",
        ctx.block.name, req.service, rule.name
    ));
    let contract = rule.build(&req)?;

    let mut bindings = Vec::with_capacity(contract.placeholders.len());
    for ph in &contract.placeholders {
        let term = match ph.binding {
            Binding::Input(port) => ctx.input(port)?,
            Binding::Output(port) => ctx.output(port)?,
            Binding::State => ctx.env.fresh_signal(ph.var.name(), ph.width),
        };
        bindings.push(term)
    }

    let instance = contract.instantiate(&bindings);
    let mut c = Contribution::new();
    c.constants.extend(contract.constants.iter().cloned());
    for err in instance.errors {
        let err = Error::with_chain(
            err,
            format!("while binding the {} contract of block `{}`", rule.name, ctx.block.name),
        );
        ctx.env.log.exception(&err);
        c.incomplete.push(format!(
            "block `{}`: {} contract only partially instantiated",
            ctx.block.name, rule.name
        ))
    }
    for fragment in instance.fragments {
        match fragment.role {
            Role::Init => c.init.extend(contract::formulas(fragment.term)),
            Role::Front => c.front.extend(contract::programs(fragment.term)),
            Role::Body => c.behavior.extend(contract::programs(fragment.term)),
            Role::Ode => {
                for evolution in contract::evolutions(fragment.term) {
                    c.add_evolution(evolution)
                }
            }
            Role::Guarantee => c.safety.extend(contract::formulas(fragment.term)),
        }
    }
    Ok(c)
}
