//! Verified sample corpus
//!
//! The only canonical grammars and scripts for tests. Integration tests use
//! these instead of inlining their own copies, so a format change means
//! re-verifying one file.

/// The canonical example grammar: a comma-separated list of lowercase items.
pub const LIST_GRAMMAR: &str = "list ≈ item (\",\" item)*\nitem ≈ '^[a-z]+'";

pub const LIST_SCRIPT: &str = "a,b,c";

/// Two consecutive separators violate `item`'s non-empty capture.
pub const LIST_SCRIPT_BAD: &str = "a,,c";

/// Mutually recursive arithmetic, nesting through `paren ≈ "(" expr ")"`.
pub const EXPR_GRAMMAR: &str = "expr ≈ term (op term)* {
    term ≈ num | paren
    paren ≈ \"(\" expr \")\"
    op ≈ '^[+*-]'
    num ≈ '^[0-9]+'
}";

pub const EXPR_SCRIPTS: &[&str] = &["7", "1+2*3", "(1+2)*3", "((42))", "1+(2*(3+4))-5"];

pub const EXPR_SCRIPTS_BAD: &[&str] = &["", "1+", "(1+2", "1++2", ")("];

/// A block-structured node language with alias links: `@path` records a
/// non-owning edge to an existing node instead of new structure.
pub const NODE_GRAMMAR: &str = "graph ≈ node+ {
    node ≈ name (block | link)*
    block ≈ \"{\" node+ \"}\"
    link ≈ \"@\" @path
    path ≈ '^[A-Za-z_][A-Za-z0-9_.]*'
    name ≈ '^[A-Za-z_][A-Za-z0-9_]*'
}";

/// Diamond sharing: `panel` links into `size`, `alias` links to `size`
/// itself, and `deep` resolves *through* the alias.
pub const NODE_SCRIPT: &str = "root {
    size {
        w
        h
    }
    panel @root.size.w
    alias @root.size
    deep @root.alias.h
}";

/// The same script in its rendered normal form (spacing and line layout
/// normalized; block structure preserved).
pub const NODE_SCRIPT_NORMAL: &str = "root {
    size {
        w h
    }
    panel@root.size.w alias@root.size deep@root.alias.h
}";

/// Alias cycle: both links resolve only through each other.
pub const NODE_SCRIPT_ALIAS_CYCLE: &str = "x @y.p\ny @x.p";

/// Ordered choice commits to the first group alternative: `ac` parses,
/// `abc` does not, even though the second alternative would accept it.
pub const TRICKY_GROUP_GRAMMAR: &str = "tricky ≈ (\"a\" | \"a\" \"b\") \"c\"";
