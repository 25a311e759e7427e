// Column-name resolution for spreadsheet headers that drift between
// snapshots ("Aderência Cancelamento" one week, "aderencia_cancelamento_ok"
// the next).
use crate::table::Table;
use tracing::debug;

/// How header names are folded before comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Normalization {
    /// trim, lowercase, strip accents, drop `_` and spaces
    #[default]
    Plain,
    /// as `Plain`, and `%` becomes the literal token `pct`
    PercentAsPct,
}

/// Well-known columns whose header has had several spellings.
///
/// Candidates are listed in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnAlias {
    CancelAdherence,
    CancelCount,
    TotalOrders,
    Regional,
}

impl ColumnAlias {
    pub fn candidates(self) -> &'static [&'static str] {
        match self {
            ColumnAlias::CancelAdherence => &["aderenciacancelamento", "aderenciacancelamentook"],
            ColumnAlias::CancelCount => &[
                "contagemcancelamentos",
                "contagemcancelamento",
                "qtdcancelamentos",
                "quantidadecancelamentos",
            ],
            ColumnAlias::TotalOrders => &["totalorders", "totalpedidos", "qtdpedidos"],
            ColumnAlias::Regional => &["regional", "region", "regiao"],
        }
    }

    pub fn resolve(self, table: &Table) -> Option<String> {
        resolve_column(table, self.candidates())
    }
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

pub fn normalize_column_name(name: &str, mode: Normalization) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.trim().to_lowercase().chars() {
        match c {
            '_' | ' ' => {}
            '%' if mode == Normalization::PercentAsPct => out.push_str("pct"),
            c => out.push(fold_accent(c)),
        }
    }
    out
}

/// First candidate (in the given order) matching an actual column after
/// normalization, returned as the table's own spelling.
pub fn resolve_column<S: AsRef<str>>(table: &Table, candidates: &[S]) -> Option<String> {
    resolve_column_with(table, candidates, Normalization::Plain)
}

pub fn resolve_column_with<S: AsRef<str>>(
    table: &Table,
    candidates: &[S],
    mode: Normalization,
) -> Option<String> {
    let normalized: Vec<(String, &String)> = table
        .columns()
        .iter()
        .map(|col| (normalize_column_name(col, mode), col))
        .collect();
    for candidate in candidates {
        let wanted = normalize_column_name(candidate.as_ref(), mode);
        if let Some((_, actual)) = normalized.iter().find(|(norm, _)| *norm == wanted) {
            debug!(candidate = candidate.as_ref(), column = actual.as_str(), "resolved column alias");
            return Some(actual.to_string());
        }
    }
    None
}
