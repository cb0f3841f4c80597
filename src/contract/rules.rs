//! Contract rules.
//!
//! Rules are tried in order on the lower-cased service name, the first match builds the
//! contract.
//!
//! | rule             | service name            | behavior                                  |
//! |------------------|-------------------------|-------------------------------------------|
//! | range limiter    | ends with `limiter`     | `y` is `u` clamped to `[Lower, Upper]`    |
//! | range monitor    | ends with `monitor`     | guarantees `u` stays in `[Min, Max]`      |
//! | PI controller    | contains `controller`   | `y = Kp·u + Ki·∫u`                        |
//! | first-order lag  | contains `filter`       | `x' = (u - x) / Tau`, `y = x`             |

crate::prelude!();

use super::{Binding, Contract, Request, Role};

/// A contract rule.
pub struct Rule {
    /// Rule name.
    pub name: &'static str,
    matches: fn(&str) -> bool,
    build: fn(&Request) -> Res<Contract>,
}
impl fmt::Debug for Rule {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "Rule({})", self.name)
    }
}
impl Rule {
    /// True if the rule applies to a service name.
    pub fn matches(&self, service: &str) -> bool {
        (self.matches)(&service.to_lowercase())
    }
    /// Builds the contract.
    pub fn build(&self, req: &Request) -> Res<Contract> {
        (self.build)(req).chain_err(|| format!("while building {} contract", self.name))
    }
}

/// Contract rules, in priority order.
pub const RULES: &[Rule] = &[
    Rule {
        name: "range limiter",
        matches: |s| s.ends_with("limiter"),
        build: limiter,
    },
    Rule {
        name: "range monitor",
        matches: |s| s.ends_with("monitor"),
        build: monitor,
    },
    Rule {
        name: "PI controller",
        matches: |s| s.contains("controller"),
        build: controller,
    },
    Rule {
        name: "first-order lag",
        matches: |s| s.contains("filter"),
        build: lag,
    },
];

/// First rule matching a service name.
pub fn select(service: &str) -> Res<&'static Rule> {
    RULES
        .iter()
        .find(|rule| rule.matches(service))
        .ok_or_else(|| ErrorKind::UnknownService(service.into()).into())
}

fn rel(lft: &Term, cmp: Cmp, rgt: &Term) -> Formula {
    Formula::rel(lft.clone(), cmp, rgt.clone())
}

fn assign(var: &Term, term: Term) -> Res<Program> {
    match var.as_var() {
        Some(var) => Ok(Program::assign(var.clone(), term)),
        None => bail!("cannot assign to `{}`", var),
    }
}

fn limiter(req: &Request) -> Res<Contract> {
    let mut contract = Contract::new("range limiter");
    let width = req.width()?;
    let u = req.placeholder(&mut contract, "u", width, Binding::Input(1));
    let y = req.placeholder(&mut contract, "y", width, Binding::Output(1));
    let lo = req.param(&mut contract, "Lower", -1)?;
    let hi = req.param(&mut contract, "Upper", 1)?;

    contract.add(Role::Init, rel(&lo, Cmp::Le, &hi));
    contract.add(
        Role::Body,
        Program::choice(vec![
            Program::seq(vec![
                Program::test(rel(&u, Cmp::Lt, &lo)),
                assign(&y, lo.clone())?,
            ]),
            Program::seq(vec![
                Program::test(rel(&u, Cmp::Gt, &hi)),
                assign(&y, hi.clone())?,
            ]),
            Program::seq(vec![
                Program::test(Formula::and(vec![
                    rel(&lo, Cmp::Le, &u),
                    rel(&u, Cmp::Le, &hi),
                ])),
                assign(&y, u.clone())?,
            ]),
        ]),
    );
    contract.add(
        Role::Guarantee,
        Formula::and(vec![rel(&lo, Cmp::Le, &y), rel(&y, Cmp::Le, &hi)]),
    );
    Ok(contract)
}

fn monitor(req: &Request) -> Res<Contract> {
    let mut contract = Contract::new("range monitor");
    let width = req.width()?;
    let u = req.placeholder(&mut contract, "u", width, Binding::Input(1));
    let min = req.param(&mut contract, "Min", -1)?;
    let max = req.param(&mut contract, "Max", 1)?;
    contract.add(
        Role::Guarantee,
        Formula::and(vec![rel(&min, Cmp::Le, &u), rel(&u, Cmp::Le, &max)]),
    );
    Ok(contract)
}

fn controller(req: &Request) -> Res<Contract> {
    let mut contract = Contract::new("PI controller");
    let width = req.width()?;
    let u = req.placeholder(&mut contract, "u", width, Binding::Input(1));
    let y = req.placeholder(&mut contract, "y", width, Binding::Output(1));
    let integral = req.placeholder(&mut contract, "i", width, Binding::State);
    let kp = req.param(&mut contract, "Kp", 1)?;
    let ki = req.param(&mut contract, "Ki", 0)?;

    contract.add(Role::Init, rel(&integral, Cmp::Eq, &Term::int(0)));
    contract.add(
        Role::Body,
        assign(
            &y,
            Term::binary(
                Op::Add,
                Term::binary(Op::Mul, kp, u.clone()),
                Term::binary(Op::Mul, ki, integral.clone()),
            ),
        )?,
    );
    let integral = match integral.as_var() {
        Some(var) => var.clone(),
        None => bail!("illegal integral state `{}`", integral),
    };
    contract.add(
        Role::Ode,
        Program::from(Evolution::new(vec![Ode::new(integral, u)], Formula::True)),
    );
    Ok(contract)
}

fn lag(req: &Request) -> Res<Contract> {
    let mut contract = Contract::new("first-order lag");
    let width = req.width()?;
    let u = req.placeholder(&mut contract, "u", width, Binding::Input(1));
    let y = req.placeholder(&mut contract, "y", width, Binding::Output(1));
    let x = req.placeholder(&mut contract, "x", width, Binding::State);
    let tau = req.param(&mut contract, "Tau", 1)?;
    let x0 = req.param(&mut contract, "InitialValue", 0)?;

    contract.add(Role::Init, rel(&tau, Cmp::Gt, &Term::int(0)));
    contract.add(Role::Init, rel(&x, Cmp::Eq, &x0));
    // The output only depends on the state.
    contract.add(Role::Front, assign(&y, x.clone())?);
    let state = match x.as_var() {
        Some(var) => var.clone(),
        None => bail!("illegal filter state `{}`", x),
    };
    contract.add(
        Role::Ode,
        Program::from(Evolution::new(
            vec![Ode::new(
                state,
                Term::binary(Op::Div, Term::binary(Op::Sub, u, x), tau),
            )],
            Formula::True,
        )),
    );
    Ok(contract)
}

#[cfg(test)]
mod test {
    use super::*;
    use simulink::{Block, Model};

    #[test]
    fn selection() {
        assert_eq!(select("S-Function:SpeedLimiter").unwrap().name, "range limiter");
        assert_eq!(select("S-Function:altitude_monitor").unwrap().name, "range monitor");
        assert_eq!(select("lib:CruiseControllerV2").unwrap().name, "PI controller");
        assert_eq!(select("lib:filterbank").unwrap().name, "first-order lag");
        // Order matters: `filter_monitor` is a monitor.
        assert_eq!(select("lib:filter_monitor").unwrap().name, "range monitor");
        let err = select("S-Function:mystery").unwrap_err();
        match err.kind() {
            ErrorKind::UnknownService(s) => assert_eq!(s, "S-Function:mystery"),
            kind => panic!("unexpected error {}", kind),
        }
    }

    #[test]
    fn limiter_fragments() {
        let mut graph = Model::new("lim");
        graph.add_block(
            Block::new("lim", "S-Function")
                .with_ports(1, 1)
                .with_param("FunctionName", "limiter")
                .with_param("Upper", "vmax"),
        );
        let req = Request::new(&graph, 0);
        let contract = select(&req.service).unwrap().build(&req).unwrap();
        assert_eq!(contract.placeholders.len(), 2);
        assert_eq!(contract.constants, vec![Constant::new("vmax")]);
        assert_eq!(contract.fragments.len(), 3);
        assert_eq!(contract.fragments[0].term.to_string(), "-1 <= vmax()");
        assert_eq!(
            contract.fragments[2].term.to_string(),
            "-1 <= lim_y & lim_y <= vmax()"
        );
    }

    #[test]
    fn illegal_width() {
        let mut graph = Model::new("mon");
        graph.add_block(
            Block::new("mon", "S-Function")
                .with_ports(1, 0)
                .with_param("FunctionName", "monitor")
                .with_param("Width", "three"),
        );
        let req = Request::new(&graph, 0);
        assert!(select(&req.service).unwrap().build(&req).is_err());
    }
}
