use evolution_types::ProposalPayload;

fn append_demarcated(existing: Option<&str>, marker: &str, body: &str) -> String {
    let block = format!("<!-- evolution:{marker} -->\n{body}\n<!-- /evolution:{marker} -->\n");
    match existing {
        Some(existing) => format!("{existing}\n{block}"),
        None => block,
    }
}

/// How a planned mutation should be carried out against `TargetFs`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationKind {
    /// Write `new_content` to `target` and record the inverse for rollback.
    Write,
    /// Record the mutation (and its inverse) for bookkeeping only; the
    /// actual change is delegated elsewhere (a config-update's new value is
    /// wired in by an external settings collaborator via an event, not by
    /// the Applicator itself).
    RecordOnly,
}

/// One planned change against a single target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mutation {
    pub target: String,
    pub previous_content: Option<String>,
    pub new_content: String,
    pub kind: MutationKind,
}

/// Translates a proposal's payload into the ordered list of target
/// mutations applying it requires, given the current content of each
/// target (`None` meaning the target does not yet exist).
pub fn plan_mutations(payload: &ProposalPayload, current: impl Fn(&str) -> Option<String>) -> Vec<Mutation> {
    match payload {
        ProposalPayload::RuleAdd { target, rule_text, .. } => {
            let previous = current(target);
            let new_content = append_demarcated(previous.as_deref(), "rule", rule_text);
            vec![Mutation {
                target: target.clone(),
                previous_content: previous,
                new_content,
                kind: MutationKind::Write,
            }]
        }
        ProposalPayload::ModeInstruction {
            target,
            instructions_text,
            mode_slug,
            ..
        } => {
            let previous = current(target);
            let new_content = append_demarcated(previous.as_deref(), mode_slug, instructions_text);
            vec![Mutation {
                target: target.clone(),
                previous_content: previous,
                new_content,
                kind: MutationKind::Write,
            }]
        }
        ProposalPayload::PromptRefinement {
            target,
            refinement_text,
            mode_slug,
            ..
        } => {
            let previous = current(target);
            let new_content = append_demarcated(previous.as_deref(), mode_slug, refinement_text);
            vec![Mutation {
                target: target.clone(),
                previous_content: previous,
                new_content,
                kind: MutationKind::Write,
            }]
        }
        ProposalPayload::SkillCreation {
            scope_dir,
            metadata,
            implementation,
            ..
        } => {
            let metadata_target = format!("{scope_dir}/metadata.json");
            let implementation_target = format!("{scope_dir}/implementation");
            vec![
                Mutation {
                    previous_content: current(&metadata_target),
                    new_content: metadata.clone(),
                    target: metadata_target,
                    kind: MutationKind::Write,
                },
                Mutation {
                    previous_content: current(&implementation_target),
                    new_content: implementation.clone(),
                    target: implementation_target,
                    kind: MutationKind::Write,
                },
            ]
        }
        ProposalPayload::ConfigUpdate { key, value, .. } => {
            let target = format!("config:{key}");
            vec![Mutation {
                previous_content: current(&target),
                new_content: value.clone(),
                target,
                kind: MutationKind::RecordOnly,
            }]
        }
    }
}
