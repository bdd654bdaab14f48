use rand_core::OsRng;
use txstack::{
    chain::signatures::signer_actor,
    types::{crypto_primitives::SigningKey, data_types::Actor},
};

/// A keypair together with the actor its signatures grant.
pub(crate) struct Account {
    pub(crate) signing_key: SigningKey,
    pub(crate) actor: Actor,
}

impl Account {
    pub(crate) fn generate() -> Account {
        let mut csprg = OsRng {};
        let signing_key = SigningKey::generate(&mut csprg);
        let actor = signer_actor(&signing_key.verifying_key());
        Account { signing_key, actor }
    }

    /// The address as it is written in genesis entries.
    pub(crate) fn genesis_address(&self) -> String {
        self.actor.address.to_base64url()
    }
}
