//! Scoped text macros.
//!
//! Macros are name → text mappings declared in the `[macros]` table of the
//! site, template and page manifests. While a page is compiled the three
//! mappings are stacked site → template → page, and a lookup scans from the
//! innermost mapping outwards, so a page shadows its template which shadows
//! the site.
//!
//! [`MacroScope`] is a persistent chain: [`MacroScope::push`] returns a new
//! scope with one more link and leaves the receiver untouched, so there is no
//! push/pop pairing to get wrong and the site scope can be shared by every
//! page of a build.
//!
//! An unknown name resolves to the name itself. The rendered page then shows
//! the key where the value should have been, which is easier to spot than an
//! empty string.

use std::collections::BTreeMap;
use std::rc::Rc;

/// One scope's macro values.
pub type MacroMap = BTreeMap<String, String>;

#[derive(Debug)]
struct Frame {
    values: MacroMap,
    parent: Option<Rc<Frame>>,
}

/// An immutable chain of macro mappings, innermost first.
#[derive(Debug, Clone, Default)]
pub struct MacroScope {
    head: Option<Rc<Frame>>,
}

impl MacroScope {
    /// The empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// A new chain with `values` as the innermost mapping.
    pub fn push(&self, values: MacroMap) -> MacroScope {
        MacroScope {
            head: Some(Rc::new(Frame {
                values,
                parent: self.head.clone(),
            })),
        }
    }

    /// The chain without its innermost mapping. Popping the empty chain is a no-op.
    pub fn pop(&self) -> MacroScope {
        MacroScope {
            head: self.head.as_ref().and_then(|f| f.parent.clone()),
        }
    }

    /// Number of mappings in the chain.
    pub fn depth(&self) -> usize {
        self.frames().count()
    }

    /// Value bound to `key`, innermost scope first.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.frames()
            .find_map(|frame| frame.values.get(key))
            .map(String::as_str)
    }

    /// Value bound to `key`, or `key` itself when nothing binds it.
    pub fn resolve<'a>(&'a self, key: &'a str) -> &'a str {
        self.get(key).unwrap_or(key)
    }

    fn frames(&self) -> impl Iterator<Item = &Frame> {
        std::iter::successors(self.head.as_deref(), |f| f.parent.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> MacroMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn inner_scope_shadows_outer() {
        let site = MacroScope::new().push(map(&[("x", "A")]));
        let template = site.push(map(&[("x", "B")]));
        let page = template.push(MacroMap::new());
        assert_eq!(page.resolve("x"), "B");

        let page = template.push(map(&[("x", "C")]));
        assert_eq!(page.resolve("x"), "C");
    }

    #[test]
    fn outer_values_visible_through_inner_scopes() {
        let scope = MacroScope::new()
            .push(map(&[("site", "S")]))
            .push(map(&[("page", "P")]));
        assert_eq!(scope.get("site"), Some("S"));
        assert_eq!(scope.get("page"), Some("P"));
    }

    #[test]
    fn unknown_key_resolves_to_itself() {
        let scope = MacroScope::new().push(map(&[("x", "A")]));
        assert_eq!(scope.resolve("missing"), "missing");
        assert_eq!(scope.get("missing"), None);
    }

    #[test]
    fn push_leaves_parent_untouched() {
        let site = MacroScope::new().push(map(&[("x", "A")]));
        let _page = site.push(map(&[("x", "C")]));
        assert_eq!(site.resolve("x"), "A");
        assert_eq!(site.depth(), 1);
    }

    #[test]
    fn pop_drops_innermost() {
        let scope = MacroScope::new()
            .push(map(&[("x", "A")]))
            .push(map(&[("x", "B")]));
        assert_eq!(scope.depth(), 2);
        assert_eq!(scope.pop().resolve("x"), "A");
        assert_eq!(MacroScope::new().pop().depth(), 0);
    }
}
