pub mod routes;
pub mod workspace_access;

pub mod tasks {
    pub mod tasks_handlers;
    pub mod tasks_models;
}

pub mod tags {
    pub mod tags_handlers;
    pub mod tags_models;
}

pub mod workspaces {
    pub mod workspaces_handlers;
    pub mod workspaces_models;
}

pub mod uploads {
    pub mod uploads_handlers;
    pub mod uploads_models;
}

pub mod webhooks {
    pub mod webhooks_handlers;
    pub mod webhooks_models;
    pub mod webhooks_signature;
}
