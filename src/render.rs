//! Textual rendering of dL models, in KeYmaera X archive-entry syntax.
//!
//! ```text
//! Functions.
//!   R k() = 2.
//! End.
//!
//! ProgramVariables.
//!   R x.
//! End.
//!
//! Problem.
//!   x = 0 -> [
//!     {
//!       x := x + k();
//!     }*
//!   ]x >= 0
//! End.
//! ```
//!
//! Rendering is a pure function of the model: rendering twice yields the same text.

crate::prelude!();


/// Indentation unit.
const INDENT: &str = "  ";

/// Pretty-printer for models.
#[derive(Debug, Clone)]
pub struct Printer {
    multi_line_tests: bool,
    multi_line_domains: bool,
    buf: String,
}

impl Printer {
    /// Constructor.
    ///
    /// - `multi_line_tests`: break conjunctive tests, one conjunct per line;
    /// - `multi_line_domains`: break conjunctive evolution domains, one conjunct per line.
    pub fn new(multi_line_tests: bool, multi_line_domains: bool) -> Self {
        Self {
            multi_line_tests,
            multi_line_domains,
            buf: String::new(),
        }
    }

    fn indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.buf.push_str(INDENT)
        }
    }
    fn line(&mut self, depth: usize, s: &str) {
        self.indent(depth);
        self.buf.push_str(s);
        self.buf.push('\n')
    }

    /// Renders a full model.
    pub fn model(mut self, model: &model::DLModel) -> String {
        self.buf.clear();

        self.line(0, "Functions.");
        for cst in model.constants() {
            let def = match cst.value() {
                Some(value) => format!("{} = {}", cst, Term::Real(value.clone())),
                None => cst.to_string(),
            };
            self.line(1, &format!("R {}.", def))
        }
        self.line(0, "End.");
        self.buf.push('\n');

        self.line(0, "ProgramVariables.");
        for var in model.variables() {
            self.line(1, &format!("{} {}.", var.typ(), var))
        }
        self.line(0, "End.");
        self.buf.push('\n');

        self.line(0, "Problem.");
        self.indent(1);
        self.formula(&model.problem(), 1);
        self.buf.push('\n');
        self.line(0, "End.");

        self.buf
    }

    /// Renders a formula, modalities span several lines.
    fn formula(&mut self, f: &Formula, depth: usize) {
        match f {
            Formula::Implies(lft, rgt) => {
                self.sub_formula(lft, depth, lft.prec() <= 1);
                self.buf.push_str(" -> ");
                self.sub_formula(rgt, depth, rgt.prec() < 1);
            }
            Formula::Box(p, post) => {
                self.buf.push_str("[\n");
                self.program(p, depth + 1);
                self.indent(depth);
                self.buf.push(']');
                self.sub_formula(post, depth, post.prec() < 4);
            }
            Formula::Logic(inner) => match &**inner {
                Term::Formula(f) => self.formula(f, depth),
                _ => self.buf.push_str(&f.to_string()),
            },
            _ => self.buf.push_str(&f.to_string()),
        }
    }
    fn sub_formula(&mut self, f: &Formula, depth: usize, parens: bool) {
        if parens {
            self.buf.push('(');
            self.formula(f, depth);
            self.buf.push(')');
        } else {
            self.formula(f, depth)
        }
    }

    /// Renders a conjunction, broken on several lines if `multi_line` and there are several
    /// conjuncts.
    ///
    /// Starts on the current line, does not write a final newline.
    fn conjunction(&mut self, conjuncts: &[&Formula], depth: usize, multi_line: bool) {
        for (idx, conj) in conjuncts.iter().enumerate() {
            if idx > 0 {
                if multi_line {
                    self.buf.push('\n');
                    self.indent(depth + 1);
                    self.buf.push_str("& ")
                } else {
                    self.buf.push_str(" & ")
                }
            }
            let parens = conj.prec() <= 3;
            if parens {
                self.buf.push('(')
            }
            self.formula(conj, depth + 1);
            if parens {
                self.buf.push(')')
            }
        }
    }

    fn evolution(&mut self, evolution: &Evolution, depth: usize) {
        self.indent(depth);
        self.buf.push('{');
        for (idx, ode) in evolution.odes.iter().enumerate() {
            if idx > 0 {
                self.buf.push_str(", ")
            }
            self.buf.push_str(&ode.to_string())
        }
        let domain = evolution.domain_conjuncts();
        if !domain.is_empty() {
            let multi_line = self.multi_line_domains && domain.len() > 1;
            if multi_line {
                self.buf.push('\n');
                self.indent(depth + 1);
                self.buf.push_str("& ")
            } else {
                self.buf.push_str(" & ")
            }
            self.conjunction(&domain, depth, multi_line)
        }
        self.buf.push_str("}\n")
    }

    /// Renders a program, one statement per line.
    fn program(&mut self, p: &Program, depth: usize) {
        match p {
            Program::Seq(seq) => seq.iter().for_each(|p| self.program(p, depth)),
            Program::Loop(body) => {
                self.line(depth, "{");
                self.program(body, depth + 1);
                self.line(depth, "}*");
            }
            Program::Choice(alts) => {
                self.line(depth, "{");
                for (idx, alt) in alts.iter().enumerate() {
                    if idx > 0 {
                        self.line(depth, "++")
                    }
                    self.program(alt, depth + 1)
                }
                self.line(depth, "}");
            }
            Program::Test(f) => {
                let conjuncts = f.conjuncts();
                self.indent(depth);
                self.buf.push('?');
                if conjuncts.is_empty() {
                    self.buf.push_str("true")
                } else {
                    let multi_line = self.multi_line_tests && conjuncts.len() > 1;
                    self.conjunction(&conjuncts, depth, multi_line)
                }
                self.buf.push_str(";\n")
            }
            Program::Evolution(evolution) => self.evolution(evolution, depth),
            Program::Container(container) => self.evolution(&container.to_evolution(), depth),
            Program::Assign { .. } | Program::AssignAny(_) => self.line(depth, &p.to_string()),
        }
    }
}
