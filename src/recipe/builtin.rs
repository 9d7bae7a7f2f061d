// Built-in recipes

use super::{Recipe, RecipeRegistry};
use crate::actions::Action;

/// Apache, MySQL and PHP with the common PHP modules
pub fn lamp_server() -> Recipe {
    let mut actions = vec![
        Action::update_packages(),
        Action::install_package("apache2"),
        Action::enable_service("apache2"),
        Action::start_service("apache2"),
        Action::install_package("mysql-server"),
        Action::enable_service("mysql"),
        Action::start_service("mysql"),
    ];
    actions.extend(
        [
            "php",
            "libapache2-mod-php",
            "php-mysql",
            "php-cli",
            "php-curl",
            "php-gd",
            "php-mbstring",
            "php-xml",
            "php-zip",
        ]
        .into_iter()
        .map(Action::install_package),
    );
    // Apache only picks up mod_php on restart
    actions.push(Action::restart_service("apache2"));

    Recipe::new(
        "lamp-server",
        "Complete LAMP stack with Apache, MySQL, and PHP",
        actions,
    )
}

pub fn basic_webserver() -> Recipe {
    Recipe::new(
        "webserver",
        "Basic Apache web server setup",
        web_stack("apache2"),
    )
}

pub fn nginx_webserver() -> Recipe {
    Recipe::new("nginx-webserver", "Nginx web server setup", web_stack("nginx"))
}

fn web_stack(server: &str) -> Vec<Action> {
    vec![
        Action::update_packages(),
        Action::install_package(server),
        Action::enable_service(server),
        Action::start_service(server),
        Action::install_package("curl"),
        Action::install_package("wget"),
    ]
}

/// Registry holding every built-in recipe
pub fn default_registry() -> RecipeRegistry {
    let mut registry = RecipeRegistry::new();
    registry.register(lamp_server());
    registry.register(basic_webserver());
    registry.register(nginx_webserver());
    registry
}
