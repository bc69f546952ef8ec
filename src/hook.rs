use std::str::FromStr;


/// What the manager does to the VIP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Attach,
    Detach,
}

/// Callback names the cluster manager invokes us with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    OnReload,
    OnRestart,
    OnRoleChange,
    OnStart,
    OnStop,
}

impl Hook {
    pub const ALL: [Hook; 5] = [Hook::OnReload, Hook::OnRestart, Hook::OnRoleChange, Hook::OnStart, Hook::OnStop];

    pub fn name(&self) -> &'static str {
        match self {
            Hook::OnReload => "on_reload",
            Hook::OnRestart => "on_restart",
            Hook::OnRoleChange => "on_role_change",
            Hook::OnStart => "on_start",
            Hook::OnStop => "on_stop",
        }
    }
}

impl FromStr for Hook {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hook::ALL.into_iter().find(|hook| hook.name() == s).ok_or(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Master,
    Replica,
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "master" => Ok(Role::Master),
            "replica" => Ok(Role::Replica),
            _ => Err(()),
        }
    }
}

/// Arguments of a single hook call, exactly as they were received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub hook: String,
    pub role: String,
    pub scope: String,
}

impl Invocation {
    /// `None` whenever the hook or role is unrecognised or the scope is empty.
    pub fn action(&self) -> Option<Action> {
        if self.scope.is_empty() || self.hook.parse::<Hook>().is_err() {
            return None;
        }
        match self.role.parse::<Role>() {
            Ok(Role::Master) => Some(Action::Attach),
            Ok(Role::Replica) => Some(Action::Detach),
            Err(_) => None,
        }
    }
}
