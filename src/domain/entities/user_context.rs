use uuid::Uuid;

/// The caller identity consumed by the job pipeline: an authenticated user id
/// (or anonymous) plus the premium entitlement flag.
///
/// Built once per request by the user-context middleware and passed explicitly
/// into the entitlement gate and the processing invoker, never read from
/// ambient request state inside deeper calls.
#[derive(Debug, Clone, Default)]
pub struct UserContext {
    pub user_id: Option<Uuid>,
    pub is_premium: bool,
}

impl UserContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user_id: Uuid, is_premium: bool) -> Self {
        Self {
            user_id: Some(user_id),
            is_premium,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.user_id.is_none()
    }
}
