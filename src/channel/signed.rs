use super::{vars::Vars, Role};
use crate::abiencode::types::Signature;

/// [Vars] together with both participants' signatures over the state they
/// describe. Signatures are indexed by [Role].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedVars {
    pub vars: Vars,
    pub signatures: [Signature; 2],
}

impl SignedVars {
    pub fn signature(&self, role: Role) -> Signature {
        self.signatures[role.index()]
    }
}
