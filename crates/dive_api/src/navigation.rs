//! Sidebar menu per role, gated by role and optional module activation.

use shared::{access::AccessContext, domain::UserRole};

pub const PLANNING_MODULE: &str = "planning_operations";
pub const NET_MAINTENANCE_MODULE: &str = "maintenance_networks";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuSubItem {
    pub title: &'static str,
    pub url: &'static str,
    pub role_required: Option<UserRole>,
    pub module_required: Option<&'static str>,
}

impl MenuSubItem {
    fn link(title: &'static str, url: &'static str) -> Self {
        Self {
            title,
            url,
            role_required: None,
            module_required: None,
        }
    }

    fn for_role(mut self, role: UserRole) -> Self {
        self.role_required = Some(role);
        self
    }

    fn for_module(mut self, module: &'static str) -> Self {
        self.module_required = Some(module);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub title: &'static str,
    pub url: Option<&'static str>,
    /// `Some` for collapsible groups.
    pub items: Option<Vec<MenuSubItem>>,
    pub role_required: Option<UserRole>,
    pub module_required: Option<&'static str>,
}

impl MenuItem {
    fn link(title: &'static str, url: &'static str) -> Self {
        Self {
            title,
            url: Some(url),
            items: None,
            role_required: None,
            module_required: None,
        }
    }

    fn group(title: &'static str, items: Vec<MenuSubItem>) -> Self {
        Self {
            title,
            url: None,
            items: Some(items),
            role_required: None,
            module_required: None,
        }
    }

    fn for_module(mut self, module: &'static str) -> Self {
        self.module_required = Some(module);
        self
    }
}

/// Full, unfiltered menu for the caller's role.
pub fn menu_for(access: &AccessContext) -> Vec<MenuItem> {
    if access.has_role(UserRole::Diver) && !access.assigned {
        return vec![
            MenuItem::link("Dashboard", "/"),
            MenuItem::link("Mi Perfil", "/profile-setup"),
        ];
    }

    let mut items = vec![MenuItem::link("Dashboard", "/")];

    if matches!(
        access.role,
        Some(
            UserRole::SalmonFarmAdmin
                | UserRole::ServiceAdmin
                | UserRole::Supervisor
                | UserRole::Superuser
        )
    ) {
        items.push(MenuItem::link("Cuadrillas de Buceo", "/cuadrillas-de-buceo"));
    }
    if access.is_superuser() {
        items.push(MenuItem::link("Personal Global", "/company-personnel"));
    }

    items.push(
        MenuItem::group(
            "Planificación",
            vec![
                MenuSubItem::link("Operaciones", "/operaciones").for_module(PLANNING_MODULE),
                MenuSubItem::link("HPT", "/operaciones/hpt").for_module(PLANNING_MODULE),
                MenuSubItem::link("Anexo Bravo", "/operaciones/anexo-bravo")
                    .for_module(PLANNING_MODULE),
            ],
        )
        .for_module(PLANNING_MODULE),
    );
    items.push(MenuItem::group(
        "Módulos Especializados",
        vec![
            MenuSubItem::link("Mantención de Redes", "/operaciones/network-maintenance")
                .for_module(NET_MAINTENANCE_MODULE),
        ],
    ));

    items.push(MenuItem::link("Inmersiones", "/inmersiones"));
    items.push(MenuItem::group(
        "Bitácoras",
        vec![
            MenuSubItem::link("Supervisor", "/bitacoras/supervisor"),
            MenuSubItem::link("Buzo", "/bitacoras/buzo"),
        ],
    ));
    items.push(MenuItem::link("Reportes", "/reportes"));

    match access.role {
        Some(UserRole::SalmonFarmAdmin) => items.push(MenuItem::group(
            "Mi Empresa",
            vec![
                MenuSubItem::link("Centros", "/empresas/centros"),
                MenuSubItem::link("Contratistas", "/empresas/contratistas"),
                MenuSubItem::link("Usuarios", "/empresas/usuarios"),
            ],
        )),
        Some(UserRole::ServiceAdmin) => items.push(MenuItem::group(
            "Mi Empresa",
            vec![
                MenuSubItem::link("Información", "/empresas/contratistas"),
                MenuSubItem::link("Usuarios", "/empresas/usuarios"),
            ],
        )),
        Some(UserRole::Superuser) => {
            items.push(MenuItem::group(
                "Empresas",
                vec![
                    MenuSubItem::link("Salmoneras", "/empresas/salmoneras")
                        .for_role(UserRole::Superuser),
                    MenuSubItem::link("Centros", "/empresas/centros"),
                    MenuSubItem::link("Contratistas", "/empresas/contratistas"),
                    MenuSubItem::link("Usuarios", "/empresas/usuarios"),
                ],
            ));
            items.push(MenuItem::group(
                "Admin",
                vec![
                    MenuSubItem::link("Gestión de Usuarios", "/admin/users")
                        .for_role(UserRole::Superuser),
                    MenuSubItem::link("Roles y Permisos", "/admin/roles")
                        .for_role(UserRole::Superuser),
                    MenuSubItem::link("Módulos", "/admin/modules").for_role(UserRole::Superuser),
                    MenuSubItem::link("Monitoreo", "/admin/system-monitoring")
                        .for_role(UserRole::Superuser),
                ],
            ));
        }
        _ => {}
    }

    items.push(MenuItem::link("Configuración", "/configuracion"));
    items
}

/// Drops sub-items whose role or module requirement is unmet, then drops
/// parents that are unmet themselves or were left without sub-items.
/// Superusers bypass every requirement.
pub fn filter_menu(items: Vec<MenuItem>, access: &AccessContext) -> Vec<MenuItem> {
    items
        .into_iter()
        .map(|mut item| {
            if let Some(sub_items) = item.items.take() {
                item.items = Some(
                    sub_items
                        .into_iter()
                        .filter(|sub| allowed(access, sub.role_required, sub.module_required))
                        .collect(),
                );
            }
            item
        })
        .filter(|item| {
            allowed(access, item.role_required, item.module_required)
                && item.items.as_ref().map_or(true, |sub| !sub.is_empty())
        })
        .collect()
}

pub fn visible_menu(access: &AccessContext) -> Vec<MenuItem> {
    filter_menu(menu_for(access), access)
}

fn allowed(access: &AccessContext, role: Option<UserRole>, module: Option<&str>) -> bool {
    if access.is_superuser() {
        return true;
    }
    role.map_or(true, |role| access.has_role(role))
        && module.map_or(true, |module| access.has_module_access(module))
}

#[cfg(test)]
#[path = "tests/navigation_tests.rs"]
mod tests;
