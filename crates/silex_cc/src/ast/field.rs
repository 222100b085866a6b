//! Struct/union field graphs.
//!
//! Fields form an ordered graph: members in source order, with anonymous
//! and named sub-struct/union nodes grouping their children. The graph is
//! an index-addressed arena — `parent`/`prev`/`next` are `Option<FieldId>`
//! indices into one flat `Vec`, so traversal is an index walk and removal
//! of a node can never dangle.

use crate::ast::data_type::DataType;
use silex_base::Symbol;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Member {
        data_type: Rc<DataType>,
        /// Bit-field width; 0 when absent.
        bit: u8,
    },
    AnonymousStruct,
    AnonymousUnion,
    NamedStruct,
    NamedUnion,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: Option<Symbol>,
    pub parent: Option<FieldId>,
    pub prev: Option<FieldId>,
    pub next: Option<FieldId>,
    pub kind: FieldKind,
}

impl Field {
    /// Bit-field width; 0 for non-members.
    pub fn bit(&self) -> u8 {
        match &self.kind {
            FieldKind::Member { bit, .. } => *bit,
            _ => 0,
        }
    }

    pub fn is_member(&self) -> bool {
        matches!(self.kind, FieldKind::Member { .. })
    }
}

/// The ordered field graph of one struct or union.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fields {
    nodes: Vec<Field>,
    first: Option<FieldId>,
    last: Option<FieldId>,
}

impl Fields {
    pub fn new() -> Self {
        Fields::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn first(&self) -> Option<FieldId> {
        self.first
    }

    pub fn get(&self, id: FieldId) -> &Field {
        &self.nodes[id.0]
    }

    /// Appends a field under `parent`. Fails when a sibling under the same
    /// parent already carries the same non-empty name.
    pub fn add(
        &mut self,
        name: Option<Symbol>,
        parent: Option<FieldId>,
        kind: FieldKind,
    ) -> Result<FieldId, Symbol> {
        if let Some(name) = name {
            if self
                .children(parent)
                .any(|id| self.nodes[id.0].name == Some(name))
            {
                return Err(name);
            }
        }

        let id = FieldId(self.nodes.len());
        self.nodes.push(Field {
            name,
            parent,
            prev: self.last,
            next: None,
            kind,
        });

        if let Some(last) = self.last {
            self.nodes[last.0].next = Some(id);
        }
        if self.first.is_none() {
            self.first = Some(id);
        }
        self.last = Some(id);

        Ok(id)
    }

    /// Flat traversal in source order.
    pub fn iter(&self) -> impl Iterator<Item = (FieldId, &Field)> {
        self.nodes.iter().enumerate().map(|(i, f)| (FieldId(i), f))
    }

    /// Direct children of `parent` (`None` for the top level), in source
    /// order.
    pub fn children(&self, parent: Option<FieldId>) -> impl Iterator<Item = FieldId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, f)| f.parent == parent)
            .map(|(i, _)| FieldId(i))
    }

    /// Looks up a direct child of `parent` by name.
    pub fn child_by_name(&self, parent: Option<FieldId>, name: Symbol) -> Option<FieldId> {
        self.children(parent)
            .find(|id| self.nodes[id.0].name == Some(name))
    }

    /// Embeds a clone of `other`'s whole graph under `under`. Returns the
    /// name of the first colliding field on duplicate, `Ok` otherwise.
    pub fn embed(&mut self, other: &Fields, under: Option<FieldId>) -> Result<(), Symbol> {
        let mut remap: Vec<Option<FieldId>> = vec![None; other.nodes.len()];

        for (id, field) in other.iter() {
            let parent = match field.parent {
                None => under,
                Some(p) => remap[p.0],
            };
            let new_id = self.add(field.name, parent, field.kind.clone())?;
            remap[id.0] = Some(new_id);
        }

        Ok(())
    }

    /// True if any member's type mentions a generic parameter.
    pub fn contains_generic(&self) -> bool {
        self.nodes.iter().any(|f| match &f.kind {
            FieldKind::Member { data_type, .. } => data_type.contains_generic(),
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::data_type::DataTypeKind;

    fn int() -> Rc<DataType> {
        DataType::rc(DataTypeKind::Int)
    }

    #[test]
    fn add_links_siblings_in_source_order() {
        let mut fields = Fields::new();
        let a = fields
            .add(Some(Symbol(1)), None, FieldKind::Member { data_type: int(), bit: 0 })
            .unwrap();
        let b = fields
            .add(Some(Symbol(2)), None, FieldKind::Member { data_type: int(), bit: 0 })
            .unwrap();

        assert_eq!(fields.first(), Some(a));
        assert_eq!(fields.get(a).next, Some(b));
        assert_eq!(fields.get(b).prev, Some(a));
    }

    #[test]
    fn duplicate_sibling_name_is_rejected() {
        let mut fields = Fields::new();
        fields
            .add(Some(Symbol(1)), None, FieldKind::Member { data_type: int(), bit: 0 })
            .unwrap();
        let dup = fields.add(
            Some(Symbol(1)),
            None,
            FieldKind::Member { data_type: int(), bit: 0 },
        );
        assert_eq!(dup, Err(Symbol(1)));
    }

    #[test]
    fn same_name_under_different_parents_is_fine() {
        let mut fields = Fields::new();
        let group = fields
            .add(Some(Symbol(9)), None, FieldKind::NamedStruct)
            .unwrap();
        fields
            .add(Some(Symbol(1)), Some(group), FieldKind::Member { data_type: int(), bit: 0 })
            .unwrap();
        let top = fields.add(
            Some(Symbol(1)),
            None,
            FieldKind::Member { data_type: int(), bit: 0 },
        );
        assert!(top.is_ok());
    }

    #[test]
    fn embed_remaps_parents() {
        let mut inner = Fields::new();
        inner
            .add(Some(Symbol(1)), None, FieldKind::Member { data_type: int(), bit: 0 })
            .unwrap();

        let mut outer = Fields::new();
        let anon = outer.add(None, None, FieldKind::AnonymousStruct).unwrap();
        outer.embed(&inner, Some(anon)).unwrap();

        let kids: Vec<_> = outer.children(Some(anon)).collect();
        assert_eq!(kids.len(), 1);
        assert_eq!(outer.get(kids[0]).name, Some(Symbol(1)));
    }
}
