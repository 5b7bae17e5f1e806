use crate::reference::IssueReference;

/// Whether a referenced issue can be linked directly under the target.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OwnerRelation {
	SameOwner,
	/// Needs a proxy issue under the target's owner
	CrossOwner,
}

/// Compare the reference's owner with the target's. GitHub logins are case-insensitive.
pub fn resolve(reference: &IssueReference, target_owner: &str) -> OwnerRelation {
	if reference.owner.eq_ignore_ascii_case(target_owner) {
		OwnerRelation::SameOwner
	} else {
		OwnerRelation::CrossOwner
	}
}

/// Whether `reference` names `target` itself. Owner and repo names compare case-insensitively.
pub fn is_same_issue(reference: &IssueReference, target: &IssueReference) -> bool {
	reference.number == target.number && reference.owner.eq_ignore_ascii_case(&target.owner) && reference.repo.eq_ignore_ascii_case(&target.repo)
}
