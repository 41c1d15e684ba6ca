pub(crate) mod jail;
pub(crate) mod outcome;
