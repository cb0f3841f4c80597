//! Block parameter values.
//!
//! Parameters are strings as written in the model: numbers (`2`, `-0.5`, `1e-3`), identifiers
//! (workspace variables, translated as dL constants), or vector literals (`[1 2 3]`,
//! `[1, 2, 3]`).

crate::prelude!();

/// Largest exponent magnitude [`number`] accepts.
pub const MAX_EXPONENT: i32 = 4096;

/// Parses a number.
///
/// Exponents beyond [`MAX_EXPONENT`] are rejected.
///
/// ```rust
/// # use sldl::transform::param::number;
/// # use num::BigRational as Rat;
/// assert_eq!(number("-2.5"), Some(Rat::new((-5).into(), 2.into())));
/// assert_eq!(number("1e-3"), Some(Rat::new(1.into(), 1000.into())));
/// assert_eq!(number(".5"), Some(Rat::new(1.into(), 2.into())));
/// assert_eq!(number("x"), None);
/// ```
pub fn number(s: &str) -> Option<Rat> {
    let s = s.trim();
    let (neg, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let (mantissa, exp) = match s.find(|c: char| c == 'e' || c == 'E') {
        Some(idx) => (&s[..idx], s[idx + 1..].parse::<i32>().ok()?),
        None => (s, 0),
    };
    if exp.checked_abs()? > MAX_EXPONENT {
        return None;
    }
    let (int, frac) = match mantissa.find('.') {
        Some(idx) => (&mantissa[..idx], &mantissa[idx + 1..]),
        None => (mantissa, ""),
    };
    let is_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (int.is_empty() && frac.is_empty()) || !is_digits(int) || !is_digits(frac) {
        return None;
    }
    let digits: Int = format!("{}{}", int, frac).parse().ok()?;
    let shift = exp.checked_sub(i32::try_from(frac.len()).ok()?)?;
    let res = Rat::from_integer(digits) * Rat::from_integer(Int::from(10u8)).pow(shift);
    Some(if neg { -res } else { res })
}

/// True if `s` is a legal identifier.
pub fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Parses a scalar parameter, returns the constants it mentions.
///
/// Identifiers can be negated: `-k` is `-k()`.
pub fn scalar(s: &str) -> Res<(Term, Vec<Constant>)> {
    let s = s.trim();
    if let Some(r) = number(s) {
        return Ok((Term::Real(r), vec![]));
    }
    let (neg, ident) = match s.strip_prefix('-') {
        Some(rest) => (true, rest.trim()),
        None => (false, s),
    };
    if !is_ident(ident) {
        bail!("expected a number or an identifier, found `{}`", s)
    }
    let cst = Constant::new(ident);
    let term = Term::cst(cst.clone());
    let term = if neg {
        Term::app(Op::Neg, vec![term])
    } else {
        term
    };
    Ok((term, vec![cst]))
}

/// Parses a scalar or vector parameter, returns its items and the constants they mention.
///
/// A scalar yields a single item.
pub fn items(s: &str) -> Res<(Vec<Term>, Vec<Constant>)> {
    let s = s.trim();
    let inner = match s.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        Some(inner) => inner,
        None => {
            let (term, csts) = scalar(s)?;
            return Ok((vec![term], csts));
        }
    };
    let mut items = vec![];
    let mut csts = vec![];
    for item in inner
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|item| !item.is_empty())
    {
        let (term, item_csts) = scalar(item)?;
        items.push(term);
        csts.extend(item_csts);
    }
    if items.is_empty() {
        bail!("empty vector literal `{}`", s)
    }
    Ok((items, csts))
}

/// Parses a parameter as a term: a vector if it has several items.
pub fn value(s: &str) -> Res<(Term, Vec<Constant>)> {
    let (mut items, csts) = items(s)?;
    if items.len() == 1 {
        if let Some(item) = items.pop() {
            return Ok((item, csts));
        }
    }
    Ok((Term::vector(items), csts))
}

/// Parses a sign list such as `+-`, `|++` or a number of inputs.
///
/// Returns one boolean per input, false for subtracted (or divided) inputs. `pos` and `neg` are
/// the characters for each case, `|` is ignored.
pub fn signs(s: &str, pos: char, neg: char) -> Res<Vec<bool>> {
    let s = s.trim();
    if let Ok(n) = s.parse::<usize>() {
        return Ok(vec![true; n]);
    }
    let mut res = vec![];
    for c in s.chars() {
        match c {
            '|' => (),
            c if c == pos => res.push(true),
            c if c == neg => res.push(false),
            c => bail!("illegal character `{}` in sign list `{}`", c, s),
        }
    }
    Ok(res)
}
