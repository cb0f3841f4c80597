//! The dL model under construction.
//!
//! Block transformers contribute to a [`DLModel`] additively. Once all blocks are translated the
//! model yields the proof obligation
//!
//! ```text
//! init -> [{ behavior; evolution }*]safety
//! ```
//!
//! where `behavior` runs the front elements (added with [`DLModel::add_behavior_front`]) before
//! the other ones, and `evolution` is omitted when no block contributed an ODE.

crate::prelude!();

/// A differential dynamic logic model.
#[derive(Debug, Clone)]
pub struct DLModel {
    constants: IndexSet<Constant>,
    variables: IndexSet<Var>,
    init: Vec<Formula>,
    front: usize,
    behavior: Vec<Program>,
    odes: Vec<Ode>,
    domain: Vec<Formula>,
    condition: Vec<Formula>,
    safety: Vec<Formula>,
    incomplete: Vec<String>,
}

impl Default for DLModel {
    fn default() -> Self {
        Self::new()
    }
}

impl DLModel {
    /// Empty model constructor.
    pub fn new() -> Self {
        Self {
            constants: IndexSet::new(),
            variables: IndexSet::new(),
            init: vec![],
            front: 0,
            behavior: vec![],
            odes: vec![],
            domain: vec![],
            condition: vec![],
            safety: vec![],
            incomplete: vec![],
        }
    }

    /// Declares a constant, false if it was already declared.
    pub fn add_constant(&mut self, cst: Constant) -> bool {
        self.constants.insert(cst)
    }
    /// Declares a variable, false if it was already declared.
    pub fn add_variable(&mut self, var: Var) -> bool {
        self.variables.insert(var)
    }
    /// Adds an initial condition, ignored if already present.
    pub fn add_init(&mut self, f: Formula) {
        if f != Formula::True && !self.init.contains(&f) {
            self.init.push(f)
        }
    }
    /// Appends a behavior element.
    pub fn add_behavior(&mut self, p: Program) {
        self.behavior.push(p)
    }
    /// Adds a behavior element that runs before all the non-front ones.
    ///
    /// Front elements keep the order they are added in.
    pub fn add_behavior_front(&mut self, p: Program) {
        self.behavior.insert(self.front, p);
        self.front += 1;
    }
    /// Adds an ODE to the global evolution.
    pub fn add_ode(&mut self, ode: Ode) {
        self.odes.push(ode)
    }
    /// Adds a conjunct to the evolution domain.
    pub fn add_domain(&mut self, f: Formula) {
        if f != Formula::True && !self.domain.contains(&f) {
            self.domain.push(f)
        }
    }
    /// Adds a conjunct to the activation condition of the global evolution.
    pub fn add_condition(&mut self, f: Formula) {
        if f != Formula::True && !self.condition.contains(&f) {
            self.condition.push(f)
        }
    }
    /// Adds a safety condition, ignored if already present.
    pub fn add_safety(&mut self, f: Formula) {
        if f != Formula::True && !self.safety.contains(&f) {
            self.safety.push(f)
        }
    }
    /// Marks the model incomplete.
    pub fn mark_incomplete(&mut self, reason: impl Into<String>) {
        self.incomplete.push(reason.into())
    }

    /// Constants, in declaration order.
    pub fn constants(&self) -> &IndexSet<Constant> {
        &self.constants
    }
    /// Variables, in declaration order.
    pub fn variables(&self) -> &IndexSet<Var> {
        &self.variables
    }
    /// Initial conditions.
    pub fn init(&self) -> &[Formula] {
        &self.init
    }
    /// Behavior elements, front elements first.
    pub fn behavior(&self) -> &[Program] {
        &self.behavior
    }
    /// ODEs of the global evolution.
    pub fn odes(&self) -> &[Ode] {
        &self.odes
    }
    /// Safety conditions.
    pub fn safety(&self) -> &[Formula] {
        &self.safety
    }
    /// Reasons why the model is incomplete.
    pub fn incomplete(&self) -> &[String] {
        &self.incomplete
    }
    /// True if no contribution failed.
    pub fn is_complete(&self) -> bool {
        self.incomplete.is_empty()
    }

    /// Global evolution, if any ODE was contributed.
    pub fn evolution(&self) -> Option<EvolutionContainer> {
        if self.odes.is_empty() {
            None
        } else {
            Some(EvolutionContainer::new(
                Evolution::new(self.odes.clone(), conjunction(&self.domain)),
                conjunction(&self.condition),
            ))
        }
    }

    /// Loop body: the behavior followed by the global evolution.
    pub fn body(&self) -> Program {
        let mut body = self.behavior.clone();
        if let Some(evolution) = self.evolution() {
            body.push(Program::Container(evolution))
        }
        Program::Seq(body)
    }

    /// The proof obligation `init -> [{ body }*]safety`.
    pub fn problem(&self) -> Formula {
        Formula::implies(
            conjunction(&self.init),
            Formula::boxed(
                Program::repeat(self.body()),
                conjunction(&self.safety),
            ),
        )
    }

    /// Variables the problem mentions but that are not declared.
    ///
    /// Non-empty after a failed placeholder substitution for instance.
    pub fn undeclared(&self) -> Vec<Var> {
        let mut vars = IndexSet::new();
        self.problem().collect_vars(&mut vars);
        vars.into_iter()
            .filter(|var| !self.variables.contains(var))
            .collect()
    }

    /// Constants the problem mentions but that are not declared.
    pub fn undeclared_constants(&self) -> Vec<Constant> {
        let mut csts = IndexSet::new();
        self.problem().collect_csts(&mut csts);
        csts.into_iter()
            .filter(|cst| !self.constants.iter().any(|known| known.name() == cst.name()))
            .collect()
    }

    /// Renders the model in KeYmaera X syntax, see [`render`].
    pub fn render(&self, multi_line_tests: bool, multi_line_domains: bool) -> String {
        render::Printer::new(multi_line_tests, multi_line_domains).model(self)
    }
}

/// Conjunction of some formulas, nested conjunctions are flattened.
fn conjunction(formulas: &[Formula]) -> Formula {
    Formula::and(formulas.iter().flat_map(Formula::conjuncts).cloned().collect())
}
