use std::fmt::Write;

use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{AncestorRef, Animal, Gender, PedigreeNode};
use crate::store::HerdStore;

/// Generations kept in a pedigree, counting the subject as generation 1.
pub const MAX_GENERATIONS: u8 = 4;

pub async fn build_pedigree<S>(store: &S, animal_id: Uuid) -> Option<PedigreeNode>
where
    S: HerdStore + ?Sized,
{
    build_pedigree_with_depth(store, animal_id, MAX_GENERATIONS).await
}

/// Builds the ancestor tree of `animal_id`, or `None` when the animal
/// cannot be loaded. Unregistered ancestors end their branch as leaves.
/// `max_depth` is clamped to `1..=MAX_GENERATIONS`.
pub async fn build_pedigree_with_depth<S>(
    store: &S,
    animal_id: Uuid,
    max_depth: u8,
) -> Option<PedigreeNode>
where
    S: HerdStore + ?Sized,
{
    let root = match store.get_animal_by_id(animal_id).await {
        Ok(Some(animal)) => animal,
        Ok(None) => {
            debug!(%animal_id, "pedigree root not found");
            return None;
        }
        Err(err) => {
            warn!(%animal_id, error = %err, "failed to load pedigree root");
            return None;
        }
    };

    Some(expand(store, root, 1, max_depth.clamp(1, MAX_GENERATIONS)).await)
}

fn expand<'a, S>(
    store: &'a S,
    animal: Animal,
    generation: u8,
    max_depth: u8,
) -> BoxFuture<'a, PedigreeNode>
where
    S: HerdStore + ?Sized,
{
    async move {
        let mut children = Vec::new();

        if generation < max_depth {
            let links = [
                (animal.ancestry.mother.clone(), Gender::Female),
                (animal.ancestry.father.clone(), Gender::Male),
            ];

            for (link, position) in links {
                let Some(link) = link else { continue };
                let next = generation + 1;

                let child = match link {
                    AncestorRef::Registered(id) => match store.get_animal_by_id(id).await {
                        Ok(Some(parent)) => expand(store, parent, next, max_depth).await,
                        Ok(None) => external_leaf(id.to_string(), position, next),
                        Err(err) => {
                            warn!(
                                parent_id = %id,
                                error = %err,
                                "failed to load ancestor, treating as external"
                            );
                            external_leaf(id.to_string(), position, next)
                        }
                    },
                    AncestorRef::External(name) => external_leaf(name, position, next),
                };
                children.push(child);
            }
        }

        PedigreeNode {
            id: animal.id.to_string(),
            name: animal.name,
            gender: animal.gender,
            generation,
            is_registered: true,
            children,
        }
    }
    .boxed()
}

fn external_leaf(label: String, gender: Gender, generation: u8) -> PedigreeNode {
    PedigreeNode {
        id: label.clone(),
        name: label,
        gender,
        generation,
        is_registered: false,
        children: Vec::new(),
    }
}

/// Every node below the root, in pre-order (dam's line before sire's).
pub fn flatten_ancestors(root: &PedigreeNode) -> Vec<&PedigreeNode> {
    let mut ancestors = Vec::new();
    collect(root, &mut ancestors);
    ancestors
}

fn collect<'a>(node: &'a PedigreeNode, out: &mut Vec<&'a PedigreeNode>) {
    for child in &node.children {
        out.push(child);
        collect(child, out);
    }
}

pub fn max_generation(root: &PedigreeNode) -> u8 {
    root.children
        .iter()
        .map(max_generation)
        .max()
        .unwrap_or(root.generation)
        .max(root.generation)
}

pub fn render_tree(root: &PedigreeNode) -> String {
    let mut output = String::new();
    render_node(root, None, &mut output);
    output
}

fn render_node(node: &PedigreeNode, role: Option<&str>, output: &mut String) {
    let indent = "  ".repeat(usize::from(node.generation.saturating_sub(1)));
    let marker = if node.is_registered { "" } else { " [external]" };
    let _ = match role {
        Some(role) => writeln!(output, "{indent}{role}: {}{marker}", node.name),
        None => writeln!(output, "{}{marker}", node.name),
    };

    for child in &node.children {
        let role = match child.gender {
            Gender::Female => "dam",
            Gender::Male => "sire",
            Gender::Unknown => "parent",
        };
        render_node(child, Some(role), output);
    }
}
