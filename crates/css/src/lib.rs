pub mod selector;
pub mod token;

pub use selector::{
    AttrOp, Combinator, ComplexSelector, CompoundSelector, PseudoClass, PseudoElement,
    SelectorError, SelectorList, SimpleSelector, parse_selector_list,
};
pub use token::{CssToken, CssTokenizer};
