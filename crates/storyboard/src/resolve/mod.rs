//! Relationship resolution for freshly decoded documents.
//!
//! Decoding happens in two phases. While nodes are decoded, every
//! cross-reference is registered with a [`Coordinator`] as a typed request
//! naming the slot to fill and the target id. Once every node and resource
//! exists, [`Coordinator::resolve`] turns the requests into index links in a
//! single pass and then runs the deferred finalizers.
//!
//! A reference whose target is missing, or a child claimed by a second
//! parent, is an [`IntegrityFault`]. So is a decoded node that no screen
//! reaches. Faults are logged and reported; with strict references enabled
//! they abort the load instead.

use std::fmt;

use rustc_hash::FxHashSet;

use crate::codec::DecodeOptions;
use crate::error::ResolveError;
use crate::model::{
    Action, ColorIndex, Document, Fill, GradientIndex, Id, NodeIndex, NodeKind, ResourceId,
};

/// A single link slot on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeField {
    Parent,
    Background,
    Overlay,
    Mask,
    /// Screen of a `NavigateTo` action.
    ActionTarget,
    /// Main component of a component instance.
    Component,
}

impl NodeField {
    pub fn name(self) -> &'static str {
        match self {
            NodeField::Parent => "parent",
            NodeField::Background => "backgroundID",
            NodeField::Overlay => "overlayID",
            NodeField::Mask => "maskID",
            NodeField::ActionTarget => "action.screenID",
            NodeField::Component => "componentID",
        }
    }
}

/// A list of links on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListField {
    Children,
    /// Instances of a main component.
    Instances,
}

impl ListField {
    pub fn name(self) -> &'static str {
        match self {
            ListField::Children => "childIDs",
            ListField::Instances => "instances",
        }
    }
}

/// Where a document color or gradient is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaintSlot {
    TextColor,
    Fill,
    ShadowColor,
}

impl PaintSlot {
    pub fn name(self) -> &'static str {
        match self {
            PaintSlot::TextColor => "color",
            PaintSlot::Fill => "fill",
            PaintSlot::ShadowColor => "shadow.fill",
        }
    }

    /// Kind of node that carries this slot.
    fn owner_kind(self) -> &'static str {
        match self {
            PaintSlot::TextColor => "Text",
            PaintSlot::Fill => "Rectangle",
            PaintSlot::ShadowColor => "node with a shadow",
        }
    }
}

/// Link kept on the target pointing back at the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Inverse {
    /// The target's single field is set to the owner.
    Set(NodeField),
    /// The owner is appended to the target's list.
    Append(ListField),
}

/// A single link slot on the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentSlot {
    InitialScreen,
    SegueSource(usize),
    SegueDestination(usize),
}

impl fmt::Display for DocumentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentSlot::InitialScreen => f.write_str("initialScreenID"),
            DocumentSlot::SegueSource(i) => write!(f, "segues[{i}].sourceID"),
            DocumentSlot::SegueDestination(i) => write!(f, "segues[{i}].destinationID"),
        }
    }
}

/// A list of links on the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentListSlot {
    Screens,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResourceKind {
    Color,
    Gradient,
}

/// A registered, not yet resolved, relationship.
#[derive(Debug, Clone)]
enum Pending {
    One {
        owner: NodeIndex,
        field: NodeField,
        target: Id,
        inverse: Option<Inverse>,
    },
    Many {
        owner: NodeIndex,
        field: ListField,
        targets: Vec<Id>,
        inverse: Option<Inverse>,
    },
    DocumentOne {
        slot: DocumentSlot,
        target: Id,
    },
    DocumentMany {
        slot: DocumentListSlot,
        targets: Vec<Id>,
    },
    Paint {
        owner: NodeIndex,
        slot: PaintSlot,
        kind: ResourceKind,
        resource: ResourceId,
    },
}

/// A relationship that could not be established.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityFault {
    /// No node has the target id.
    MissingNode {
        owner: Option<Id>,
        field: String,
        target: Id,
    },
    /// No color or gradient has the target id.
    MissingResource {
        owner: Id,
        field: &'static str,
        resource: ResourceId,
    },
    /// The child already belongs to another parent.
    AlreadyOwned { child: Id, parent: Id, claimed_by: Id },
    /// Linking would make a node its own ancestor.
    Cycle { parent: Id, child: Id },
    /// The target exists but has the wrong kind for the slot.
    WrongKind {
        owner: Option<Id>,
        field: String,
        target: Id,
        expected: &'static str,
    },
    /// The screen is already listed.
    DuplicateScreen { screen: Id },
    /// No screen reaches the node through children or facet sub-nodes.
    Unreachable { node: Id },
}

impl fmt::Display for IntegrityFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let owner_label = |owner: &Option<Id>| match owner {
            Some(id) => format!("node {id}"),
            None => "document".to_string(),
        };
        match self {
            IntegrityFault::MissingNode {
                owner,
                field,
                target,
            } => write!(f, "{}.{field} refers to missing node {target}", owner_label(owner)),
            IntegrityFault::MissingResource {
                owner,
                field,
                resource,
            } => write!(f, "node {owner}.{field} refers to missing resource {resource}"),
            IntegrityFault::AlreadyOwned {
                child,
                parent,
                claimed_by,
            } => write!(
                f,
                "node {child} is a child of {parent} and cannot also be a child of {claimed_by}"
            ),
            IntegrityFault::Cycle { parent, child } => {
                write!(f, "node {child} cannot be a child of its descendant {parent}")
            }
            IntegrityFault::WrongKind {
                owner,
                field,
                target,
                expected,
            } => write!(
                f,
                "{}.{field} refers to node {target}, which is not a {expected}",
                owner_label(owner)
            ),
            IntegrityFault::DuplicateScreen { screen } => {
                write!(f, "document.screenIDs lists screen {screen} more than once")
            }
            IntegrityFault::Unreachable { node } => {
                write!(f, "node {node} is not reachable from any screen")
            }
        }
    }
}

/// Outcome of a resolution pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolutionReport {
    /// Links established.
    pub resolved: usize,
    /// Links dropped, in registration order.
    pub faults: Vec<IntegrityFault>,
}

impl ResolutionReport {
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}

type Finalizer = Box<dyn FnOnce(&mut Document) + Send>;

/// Collects relationship requests during decoding and resolves them in one
/// pass. One coordinator serves exactly one document.
#[derive(Default)]
pub struct Coordinator {
    pending: Vec<Pending>,
    deferred: Vec<Finalizer>,
    require_reachable: bool,
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("pending", &self.pending.len())
            .field("deferred", &self.deferred.len())
            .field("require_reachable", &self.require_reachable)
            .finish()
    }
}

impl Coordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered relationships.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn register_one(&mut self, owner: NodeIndex, field: NodeField, target: Id, inverse: Option<Inverse>) {
        self.pending.push(Pending::One {
            owner,
            field,
            target,
            inverse,
        });
    }

    pub fn register_many(
        &mut self,
        owner: NodeIndex,
        field: ListField,
        targets: Vec<Id>,
        inverse: Option<Inverse>,
    ) {
        if targets.is_empty() {
            return;
        }
        self.pending.push(Pending::Many {
            owner,
            field,
            targets,
            inverse,
        });
    }

    pub fn register_document_one(&mut self, slot: DocumentSlot, target: Id) {
        self.pending.push(Pending::DocumentOne { slot, target });
    }

    pub fn register_document_many(&mut self, slot: DocumentListSlot, targets: Vec<Id>) {
        self.pending.push(Pending::DocumentMany { slot, targets });
    }

    pub fn register_color(&mut self, owner: NodeIndex, slot: PaintSlot, resource: ResourceId) {
        self.pending.push(Pending::Paint {
            owner,
            slot,
            kind: ResourceKind::Color,
            resource,
        });
    }

    pub fn register_gradient(&mut self, owner: NodeIndex, slot: PaintSlot, resource: ResourceId) {
        self.pending.push(Pending::Paint {
            owner,
            slot,
            kind: ResourceKind::Gradient,
            resource,
        });
    }

    /// Reports every node that no screen reaches once links are resolved.
    pub fn require_reachable(&mut self) {
        self.require_reachable = true;
    }

    /// Registers work to run after every relationship is resolved.
    /// Finalizers run once, in registration order.
    pub fn defer(&mut self, finalizer: impl FnOnce(&mut Document) + Send + 'static) {
        self.deferred.push(Box::new(finalizer));
    }

    /// Resolves every registered relationship against `doc`, then runs the
    /// finalizers.
    ///
    /// With [`DecodeOptions::strict_references`] any fault fails the pass
    /// and the finalizers do not run; the caller must discard `doc`.
    pub fn resolve(self, doc: &mut Document, options: &DecodeOptions) -> Result<ResolutionReport, ResolveError> {
        let mut pass = Pass {
            doc,
            report: ResolutionReport::default(),
        };
        for pending in self.pending {
            pass.apply(pending);
        }
        if self.require_reachable {
            pass.check_reachable();
        }
        let Pass { doc, report } = pass;

        for fault in &report.faults {
            log::warn!("unresolved reference: {fault}");
        }
        if options.strict_references && !report.faults.is_empty() {
            return Err(ResolveError::IntegrityFaults(report.faults));
        }

        for finalizer in self.deferred {
            finalizer(doc);
        }
        log::debug!(
            "resolved {} link(s), {} fault(s)",
            report.resolved,
            report.faults.len()
        );
        Ok(report)
    }
}

struct Pass<'d> {
    doc: &'d mut Document,
    report: ResolutionReport,
}

impl Pass<'_> {
    fn apply(&mut self, pending: Pending) {
        match pending {
            Pending::One {
                owner,
                field,
                target,
                inverse,
            } => {
                if let Some(index) = self.find(Some(owner), field.name(), &target) {
                    self.link_one(owner, field, index, inverse);
                }
            }
            Pending::Many {
                owner,
                field,
                targets,
                inverse,
            } => {
                for target in targets {
                    if let Some(index) = self.find(Some(owner), field.name(), &target) {
                        self.link_many(owner, field, index, inverse);
                    }
                }
            }
            Pending::DocumentOne { slot, target } => {
                if let Some(index) = self.find(None, &slot.to_string(), &target) {
                    self.link_document(slot, index);
                }
            }
            Pending::DocumentMany {
                slot: DocumentListSlot::Screens,
                targets,
            } => {
                for target in targets {
                    let Some(index) = self.find(None, "screenIDs", &target) else {
                        continue;
                    };
                    if self.doc.screens.contains(&index) {
                        self.report.faults.push(IntegrityFault::DuplicateScreen { screen: target });
                        continue;
                    }
                    if self.expect_kind(None, "screenIDs", index, "Screen") {
                        log::trace!("document.screenIDs += {target}");
                        self.doc.screens.push(index);
                        self.report.resolved += 1;
                    }
                }
            }
            Pending::Paint {
                owner,
                slot,
                kind,
                resource,
            } => self.link_paint(owner, slot, kind, resource),
        }
    }

    fn check_reachable(&mut self) {
        let reachable: FxHashSet<NodeIndex> = self.doc.reachable_nodes().into_iter().collect();
        let unreachable: Vec<Id> = self
            .doc
            .graph
            .iter()
            .filter(|(index, _)| !reachable.contains(index))
            .map(|(_, node)| node.id().clone())
            .collect();
        self.report
            .faults
            .extend(unreachable.into_iter().map(|node| IntegrityFault::Unreachable { node }));
    }

    fn find(&mut self, owner: Option<NodeIndex>, field: &str, target: &Id) -> Option<NodeIndex> {
        let found = self.doc.graph.lookup(target);
        if found.is_none() {
            let owner = owner.map(|o| self.id_of(o));
            self.report.faults.push(IntegrityFault::MissingNode {
                owner,
                field: field.to_string(),
                target: target.clone(),
            });
        }
        found
    }

    fn id_of(&self, index: NodeIndex) -> Id {
        self.doc
            .graph
            .get(index)
            .map(|node| node.id().clone())
            .unwrap_or_else(|| Id::new(format!("#{}", index.as_usize())))
    }

    fn type_name(&self, index: NodeIndex) -> Option<&'static str> {
        self.doc.graph.get(index).map(|node| node.type_name())
    }

    /// Records a fault unless `target` is a node of type `expected`.
    fn expect_kind(&mut self, owner: Option<NodeIndex>, field: &str, target: NodeIndex, expected: &'static str) -> bool {
        if self.type_name(target) == Some(expected) {
            return true;
        }
        let owner = owner.map(|o| self.id_of(o));
        self.report.faults.push(IntegrityFault::WrongKind {
            owner,
            field: field.to_string(),
            target: self.id_of(target),
            expected,
        });
        false
    }

    fn link_one(&mut self, owner: NodeIndex, field: NodeField, target: NodeIndex, inverse: Option<Inverse>) {
        let ok = match field {
            NodeField::Parent => self.adopt(target, owner),
            NodeField::Background | NodeField::Overlay | NodeField::Mask => {
                if let Some(node) = self.doc.graph.get_mut(owner) {
                    let slot = match field {
                        NodeField::Background => &mut node.facets.background,
                        NodeField::Overlay => &mut node.facets.overlay,
                        _ => &mut node.facets.mask,
                    };
                    *slot = Some(target);
                }
                true
            }
            NodeField::ActionTarget => {
                let is_screen = self.expect_kind(Some(owner), field.name(), target, "Screen");
                if is_screen {
                    if let Some(Action::NavigateTo { screen }) = self
                        .doc
                        .graph
                        .get_mut(owner)
                        .and_then(|node| node.facets.action.as_mut())
                    {
                        *screen = Some(target);
                    }
                }
                is_screen
            }
            NodeField::Component => {
                let is_main = self.expect_kind(Some(owner), field.name(), target, "MainComponent");
                if is_main {
                    if let Some(NodeKind::ComponentInstance(instance)) =
                        self.doc.graph.get_mut(owner).map(|node| &mut node.kind)
                    {
                        instance.component = Some(target);
                    }
                }
                is_main
            }
        };
        if ok {
            log::trace!("{}.{} → {}", self.id_of(owner), field.name(), self.id_of(target));
            self.report.resolved += 1;
            self.apply_inverse(owner, target, inverse);
        }
    }

    fn link_many(&mut self, owner: NodeIndex, field: ListField, target: NodeIndex, inverse: Option<Inverse>) {
        let ok = match field {
            // adopt sets the child's parent, so a parent inverse is implied.
            ListField::Children => self.adopt(owner, target),
            ListField::Instances => {
                if let Some(NodeKind::MainComponent(main)) =
                    self.doc.graph.get_mut(owner).map(|node| &mut node.kind)
                {
                    main.instances.push(target);
                    true
                } else {
                    false
                }
            }
        };
        if ok {
            self.report.resolved += 1;
            self.apply_inverse(owner, target, inverse);
        }
    }

    /// Places `child` under `parent`, recording a fault if the child is
    /// owned already or is an ancestor of the parent.
    fn adopt(&mut self, parent: NodeIndex, child: NodeIndex) -> bool {
        let existing = self.doc.graph.get(child).and_then(|node| node.parent());
        if let Some(existing) = existing {
            self.report.faults.push(IntegrityFault::AlreadyOwned {
                child: self.id_of(child),
                parent: self.id_of(existing),
                claimed_by: self.id_of(parent),
            });
            return false;
        }
        if parent == child || self.doc.graph.ancestors(parent).any(|a| a == child) {
            self.report.faults.push(IntegrityFault::Cycle {
                parent: self.id_of(parent),
                child: self.id_of(child),
            });
            return false;
        }
        log::trace!("{} childIDs += {}", self.id_of(parent), self.id_of(child));
        self.doc.graph.adopt(parent, child);
        true
    }

    fn apply_inverse(&mut self, owner: NodeIndex, target: NodeIndex, inverse: Option<Inverse>) {
        match inverse {
            None | Some(Inverse::Set(NodeField::Parent)) => {}
            Some(Inverse::Set(field)) => self.link_one(target, field, owner, None),
            Some(Inverse::Append(ListField::Instances)) => {
                if let Some(NodeKind::MainComponent(main)) =
                    self.doc.graph.get_mut(target).map(|node| &mut node.kind)
                {
                    main.instances.push(owner);
                }
            }
            Some(Inverse::Append(ListField::Children)) => {
                self.adopt(target, owner);
            }
        }
    }

    fn link_document(&mut self, slot: DocumentSlot, target: NodeIndex) {
        if !self.expect_kind(None, &slot.to_string(), target, "Screen") {
            return;
        }
        match slot {
            DocumentSlot::InitialScreen => self.doc.initial_screen = Some(target),
            DocumentSlot::SegueSource(i) => {
                if let Some(segue) = self.doc.segues.get_mut(i) {
                    segue.source = Some(target);
                }
            }
            DocumentSlot::SegueDestination(i) => {
                if let Some(segue) = self.doc.segues.get_mut(i) {
                    segue.destination = Some(target);
                }
            }
        }
        log::trace!("document.{slot} → {}", self.id_of(target));
        self.report.resolved += 1;
    }

    fn link_paint(&mut self, owner: NodeIndex, slot: PaintSlot, kind: ResourceKind, resource: ResourceId) {
        let fill = match kind {
            ResourceKind::Color => self
                .doc
                .colors
                .iter()
                .position(|c| c.id == resource)
                .map(|i| Fill::Swatch(ColorIndex(i as u32))),
            ResourceKind::Gradient => self
                .doc
                .gradients
                .iter()
                .position(|g| g.id == resource)
                .map(|i| Fill::Gradient(GradientIndex(i as u32))),
        };
        let Some(fill) = fill else {
            self.report.faults.push(IntegrityFault::MissingResource {
                owner: self.id_of(owner),
                field: slot.name(),
                resource,
            });
            return;
        };

        let Some(node) = self.doc.graph.get_mut(owner) else {
            return;
        };
        let applied = match (slot, &mut node.kind) {
            (PaintSlot::TextColor, NodeKind::Text(text)) => {
                text.color = Some(fill);
                true
            }
            (PaintSlot::Fill, NodeKind::Rectangle(rectangle)) => {
                rectangle.fill = Some(fill);
                true
            }
            (PaintSlot::ShadowColor, _) => match node.facets.shadow.as_mut() {
                Some(shadow) => {
                    shadow.fill = Some(fill);
                    true
                }
                None => false,
            },
            _ => false,
        };
        if !applied {
            let id = self.id_of(owner);
            self.report.faults.push(IntegrityFault::WrongKind {
                owner: Some(id.clone()),
                field: slot.name().to_string(),
                target: id,
                expected: slot.owner_kind(),
            });
            return;
        }
        log::trace!("{}.{} → {resource}", self.id_of(owner), slot.name());
        self.report.resolved += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::Properties;
    use crate::model::{
        Color, ComponentInstance, DocumentColor, MainComponent, Node, Rectangle, Screen, Segue,
        SegueStyle, Stack, Text,
    };

    fn insert(doc: &mut Document, id: &str, kind: impl Into<NodeKind>) -> NodeIndex {
        doc.graph.insert(Node::new(Id::new(id), kind)).unwrap()
    }

    #[test]
    fn test_children_resolve_with_parent_inverse() {
        let mut doc = Document::new();
        let screen = insert(&mut doc, "S", Screen::default());
        let a = insert(&mut doc, "A", Text::new("a"));
        let b = insert(&mut doc, "B", Text::new("b"));

        let mut coordinator = Coordinator::new();
        coordinator.register_many(
            screen,
            ListField::Children,
            vec![Id::new("A"), Id::new("GHOST"), Id::new("B")],
            Some(Inverse::Set(NodeField::Parent)),
        );
        coordinator.register_document_many(DocumentListSlot::Screens, vec![Id::new("S")]);

        let report = coordinator.resolve(&mut doc, &DecodeOptions::default()).unwrap();

        assert_eq!(doc.graph.get(screen).unwrap().children(), &[a, b]);
        assert_eq!(doc.graph.get(b).unwrap().parent(), Some(screen));
        assert_eq!(doc.screens, vec![screen]);
        assert_eq!(
            report.faults,
            vec![IntegrityFault::MissingNode {
                owner: Some(Id::new("S")),
                field: "childIDs".to_string(),
                target: Id::new("GHOST"),
            }]
        );
    }

    #[test]
    fn test_strict_mode_fails_on_any_fault() {
        let mut doc = Document::new();
        let text = insert(&mut doc, "T", Text::new("t"));

        let mut coordinator = Coordinator::new();
        coordinator.register_one(text, NodeField::Background, Id::new("NOPE"), None);
        coordinator.defer(|doc| doc.appearance = crate::model::Appearance::Dark);

        let err = coordinator.resolve(&mut doc, &DecodeOptions::strict()).unwrap_err();
        let ResolveError::IntegrityFaults(faults) = err;
        assert_eq!(faults.len(), 1);
        assert_eq!(doc.appearance, crate::model::Appearance::Auto);
    }

    #[test]
    fn test_missing_singular_target_leaves_field_unset() {
        let mut doc = Document::new();
        let text = insert(&mut doc, "T", Text::new("t"));

        let mut coordinator = Coordinator::new();
        coordinator.register_one(text, NodeField::Mask, Id::new("NOPE"), None);
        let report = coordinator.resolve(&mut doc, &DecodeOptions::default()).unwrap();

        assert_eq!(doc.graph.get(text).unwrap().facets.mask, None);
        assert_eq!(report.faults.len(), 1);
        assert_eq!(
            report.faults[0].to_string(),
            "node T.maskID refers to missing node NOPE"
        );
    }

    #[test]
    fn test_second_parent_is_a_fault() {
        let mut doc = Document::new();
        let s1 = insert(&mut doc, "S1", Stack::default());
        let s2 = insert(&mut doc, "S2", Stack::default());
        let child = insert(&mut doc, "C", Text::new("c"));

        let mut coordinator = Coordinator::new();
        for owner in [s1, s2] {
            coordinator.register_many(owner, ListField::Children, vec![Id::new("C")], Some(Inverse::Set(NodeField::Parent)));
        }
        let report = coordinator.resolve(&mut doc, &DecodeOptions::default()).unwrap();

        assert_eq!(doc.graph.get(child).unwrap().parent(), Some(s1));
        assert!(doc.graph.get(s2).unwrap().children().is_empty());
        assert!(matches!(report.faults[0], IntegrityFault::AlreadyOwned { .. }));
    }

    #[test]
    fn test_cycle_is_a_fault() {
        let mut doc = Document::new();
        let a = insert(&mut doc, "A", Stack::default());
        let b = insert(&mut doc, "B", Stack::default());

        let mut coordinator = Coordinator::new();
        coordinator.register_many(a, ListField::Children, vec![Id::new("B")], None);
        coordinator.register_many(b, ListField::Children, vec![Id::new("A")], None);
        let report = coordinator.resolve(&mut doc, &DecodeOptions::default()).unwrap();

        assert_eq!(doc.graph.get(a).unwrap().parent(), None);
        assert!(matches!(report.faults[0], IntegrityFault::Cycle { .. }));
    }

    #[test]
    fn test_component_inverse_appends_instances() {
        let mut doc = Document::new();
        let main = insert(&mut doc, "M", MainComponent::new(Properties::new()));
        let i1 = insert(&mut doc, "I1", ComponentInstance::default());
        let i2 = insert(&mut doc, "I2", ComponentInstance::default());

        let mut coordinator = Coordinator::new();
        for instance in [i1, i2] {
            coordinator.register_one(
                instance,
                NodeField::Component,
                Id::new("M"),
                Some(Inverse::Append(ListField::Instances)),
            );
        }
        coordinator.resolve(&mut doc, &DecodeOptions::default()).unwrap();

        let NodeKind::MainComponent(component) = &doc.graph.get(main).unwrap().kind else {
            panic!("expected main component");
        };
        assert_eq!(component.instances(), &[i1, i2]);
        let NodeKind::ComponentInstance(instance) = &doc.graph.get(i2).unwrap().kind else {
            panic!("expected instance");
        };
        assert_eq!(instance.component(), Some(main));
    }

    #[test]
    fn test_component_must_be_main_component() {
        let mut doc = Document::new();
        insert(&mut doc, "T", Text::new("t"));
        let instance = insert(&mut doc, "I", ComponentInstance::default());

        let mut coordinator = Coordinator::new();
        coordinator.register_one(instance, NodeField::Component, Id::new("T"), Some(Inverse::Append(ListField::Instances)));
        let report = coordinator.resolve(&mut doc, &DecodeOptions::default()).unwrap();

        assert!(matches!(
            report.faults[0],
            IntegrityFault::WrongKind { expected: "MainComponent", .. }
        ));
    }

    #[test]
    fn test_document_slots_and_paint() {
        let mut doc = Document::new();
        let s1 = insert(&mut doc, "S1", Screen::default());
        let s2 = insert(&mut doc, "S2", Screen::default());
        let rect = insert(&mut doc, "R", Rectangle::default());
        doc.colors.push(DocumentColor {
            id: ResourceId::new("C1"),
            ..DocumentColor::new(Color::WHITE)
        });
        doc.segues.push(Segue {
            source: None,
            destination: None,
            style: SegueStyle::Push,
        });

        let mut coordinator = Coordinator::new();
        coordinator.register_document_one(DocumentSlot::InitialScreen, Id::new("S2"));
        coordinator.register_document_one(DocumentSlot::SegueSource(0), Id::new("S1"));
        coordinator.register_document_one(DocumentSlot::SegueDestination(0), Id::new("S3"));
        coordinator.register_color(rect, PaintSlot::Fill, ResourceId::new("C1"));
        coordinator.register_gradient(rect, PaintSlot::Fill, ResourceId::new("G9"));
        let report = coordinator.resolve(&mut doc, &DecodeOptions::default()).unwrap();

        assert_eq!(doc.initial_screen, Some(s2));
        assert_eq!(doc.segues[0].source, Some(s1));
        assert_eq!(doc.segues[0].destination, None);
        let NodeKind::Rectangle(rectangle) = &doc.graph.get(rect).unwrap().kind else {
            panic!("expected rectangle");
        };
        assert_eq!(rectangle.fill, Some(Fill::Swatch(ColorIndex(0))));
        assert_eq!(report.resolved, 3);
        assert_eq!(report.faults.len(), 2);
    }

    #[test]
    fn test_paint_on_wrong_node_kind_is_a_fault() {
        let mut doc = Document::new();
        let text = insert(&mut doc, "T", Text::new("t"));
        doc.colors.push(DocumentColor {
            id: ResourceId::new("C1"),
            ..DocumentColor::new(Color::BLACK)
        });

        let mut coordinator = Coordinator::new();
        coordinator.register_color(text, PaintSlot::Fill, ResourceId::new("C1"));
        coordinator.register_color(text, PaintSlot::ShadowColor, ResourceId::new("C1"));
        let report = coordinator.resolve(&mut doc, &DecodeOptions::default()).unwrap();

        assert_eq!(report.resolved, 0);
        assert_eq!(
            report.faults,
            vec![
                IntegrityFault::WrongKind {
                    owner: Some(Id::new("T")),
                    field: "fill".to_string(),
                    target: Id::new("T"),
                    expected: "Rectangle",
                },
                IntegrityFault::WrongKind {
                    owner: Some(Id::new("T")),
                    field: "shadow.fill".to_string(),
                    target: Id::new("T"),
                    expected: "node with a shadow",
                },
            ]
        );
    }

    #[test]
    fn test_finalizers_run_in_order_after_links() {
        let mut doc = Document::new();
        let screen = insert(&mut doc, "S", Screen::default());
        insert(&mut doc, "A", Text::new("a"));

        let mut coordinator = Coordinator::new();
        coordinator.defer(move |doc| {
            let children = doc.graph.get(screen).unwrap().children().len();
            doc.user_info.insert("first".into(), children.into());
        });
        coordinator.defer(|doc| {
            doc.user_info.insert("second".into(), doc.user_info.len().into());
        });
        coordinator.register_many(screen, ListField::Children, vec![Id::new("A")], None);
        coordinator.resolve(&mut doc, &DecodeOptions::default()).unwrap();

        assert_eq!(doc.user_info["first"], 1);
        assert_eq!(doc.user_info["second"], 1);
    }
}
