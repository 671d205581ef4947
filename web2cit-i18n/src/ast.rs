use crate::plural::plural_form;

/// A parsed message is a flat list of nodes.
pub type AstNodeList = Vec<AstNode>;

#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
    Text(String),
    Placeholder(Placeholder),
    Transclusion(Transclusion),
}

/// Positional parameter such as `$1`. The index is 1-based, as written.
#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    pub index: usize,
}

/// A magic word like `{{PLURAL:$1|item|items}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Transclusion {
    pub name: String,
    pub param: String,
    pub options: Vec<String>,
}

pub trait Localizable {
    fn localize(&self, locale: &str, values: &[String]) -> String;
}

impl Localizable for Placeholder {
    fn localize(&self, _locale: &str, values: &[String]) -> String {
        self.index
            .checked_sub(1)
            .and_then(|i| values.get(i))
            .cloned()
            .unwrap_or_else(|| format!("${}", self.index))
    }
}

impl Transclusion {
    /// Resolve the parameter, substituting `$n` from `values` when needed.
    fn resolve_param(&self, values: &[String]) -> String {
        match self.param.strip_prefix('$').map(str::parse::<usize>) {
            Some(Ok(index)) => Placeholder { index }.localize("", values),
            _ => self.param.clone(),
        }
    }
}

impl Localizable for Transclusion {
    fn localize(&self, locale: &str, values: &[String]) -> String {
        let param = self.resolve_param(values);
        match self.name.to_uppercase().as_str() {
            "PLURAL" => {
                // MediaWiki accepts formatted numbers such as "1,000"
                let count = param.replace([',', ' '], "").parse::<usize>().ok();
                match count.and_then(|n| plural_form(locale, n, &self.options)) {
                    Some(form) => form.to_string(),
                    None => self.options.last().cloned().unwrap_or_default(),
                }
            }
            // No user gender is known on this server, use the neutral form
            "GENDER" => self.options.last().cloned().unwrap_or_default(),
            _ => self.to_string(),
        }
    }
}

impl std::fmt::Display for Transclusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{{{}:{}", self.name, self.param)?;
        for option in &self.options {
            write!(f, "|{}", option)?;
        }
        write!(f, "}}}}")
    }
}
