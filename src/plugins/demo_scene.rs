// Demo host: a straight road through one tunnel, lamp posts along the road and a camera that
// drives back and forth. Exercises both lighting controllers without any game attached.
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use crate::plugins::baseline::{SceneLight, Sun};
use crate::plugins::bubble::{RefreshLighting, SceneReady, DEFAULT_LIGHT_COLORS};
use crate::plugins::classify::PortableLight;
use crate::plugins::observer::ObserverCamera;

const ROAD_HALF_LENGTH: f32 = 120.0;
const TUNNEL_HALF_LENGTH: f32 = 25.0;
const TUNNEL_HALF_WIDTH: f32 = 6.0;
const TUNNEL_HEIGHT: f32 = 6.0;
const LAMP_SPACING: f32 = 15.0;
const EYE_HEIGHT: f32 = 1.6;

#[derive(Resource, Debug, Clone, Copy)]
pub struct DemoDrive {
    pub z: f32,
    pub heading: f32, // +1 / -1 along the road
    pub speed: f32,
}
impl Default for DemoDrive {
    fn default() -> Self {
        Self { z: -ROAD_HALF_LENGTH + 10.0, heading: 1.0, speed: 8.0 }
    }
}

pub struct DemoScenePlugin {
    pub with_tunnel: bool,
}
impl Default for DemoScenePlugin {
    fn default() -> Self {
        Self { with_tunnel: true }
    }
}

#[derive(Resource, Clone, Copy)]
struct DemoLayout {
    with_tunnel: bool,
}

impl Plugin for DemoScenePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(DemoLayout { with_tunnel: self.with_tunnel })
            .init_resource::<DemoDrive>()
            .add_systems(Startup, spawn_demo_scene)
            .add_systems(Update, (drive_camera, refresh_hotkey));
    }
}

fn spawn_demo_scene(
    mut commands: Commands,
    layout: Res<DemoLayout>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut ev_ready: EventWriter<SceneReady>,
) {
    let drive = DemoDrive::default();
    commands.spawn((
        Camera3dBundle {
            transform: Transform::from_xyz(0.0, EYE_HEIGHT, drive.z).looking_at(Vec3::new(0.0, EYE_HEIGHT, 0.0), Vec3::Y),
            ..default()
        },
        ObserverCamera,
        Name::new("DemoCamera"),
    ));

    commands.spawn((
        DirectionalLightBundle {
            directional_light: DirectionalLight { illuminance: 30_000.0, shadows_enabled: true, ..default() },
            transform: Transform::from_xyz(20.0, 30.0, 20.0).looking_at(Vec3::ZERO, Vec3::Y),
            ..default()
        },
        Sun,
        Name::new("Sun"),
    ));

    // Ground
    commands.spawn((
        PbrBundle {
            mesh: meshes.add(Plane3d::default().mesh().size(80.0, ROAD_HALF_LENGTH * 2.0 + 40.0)),
            material: materials.add(Color::srgb(0.25, 0.45, 0.25)),
            ..default()
        },
        RigidBody::Fixed,
        Collider::cuboid(40.0, 0.05, ROAD_HALF_LENGTH + 20.0),
        Name::new("Ground"),
    ));

    if layout.with_tunnel {
        let concrete = materials.add(Color::srgb(0.55, 0.55, 0.52));
        let wall_half = Vec3::new(0.5, TUNNEL_HEIGHT * 0.5, TUNNEL_HALF_LENGTH);
        let ceiling_half = Vec3::new(TUNNEL_HALF_WIDTH + 0.5, 0.5, TUNNEL_HALF_LENGTH);
        let pieces = [
            ("WestWallTunnel", Vec3::new(-TUNNEL_HALF_WIDTH, TUNNEL_HEIGHT * 0.5, 0.0), wall_half),
            ("EastWallTunnel", Vec3::new(TUNNEL_HALF_WIDTH, TUNNEL_HEIGHT * 0.5, 0.0), wall_half),
            ("RoadTunnel", Vec3::new(0.0, TUNNEL_HEIGHT + 0.5, 0.0), ceiling_half),
        ];
        for (name, at, half) in pieces {
            commands.spawn((
                PbrBundle {
                    mesh: meshes.add(Cuboid::new(half.x * 2.0, half.y * 2.0, half.z * 2.0)),
                    material: concrete.clone(),
                    transform: Transform::from_translation(at),
                    ..default()
                },
                RigidBody::Fixed,
                Collider::cuboid(half.x, half.y, half.z),
                Name::new(name),
            ));
        }
    }

    // Lamp posts on the east verge; every fifth one carries a custom color the bubble must skip.
    let pole = meshes.add(Cuboid::new(0.2, 5.0, 0.2));
    let pole_mat = materials.add(Color::srgb(0.2, 0.2, 0.22));
    let mut lamps = 0;
    let mut z = -ROAD_HALF_LENGTH;
    while z <= ROAD_HALF_LENGTH {
        let color = if lamps % 5 == 4 {
            Color::srgb(0.9, 0.2, 0.2)
        } else {
            let c = DEFAULT_LIGHT_COLORS[lamps % DEFAULT_LIGHT_COLORS.len()];
            Color::srgb(c.x, c.y, c.z)
        };
        commands
            .spawn((
                PbrBundle {
                    mesh: pole.clone(),
                    material: pole_mat.clone(),
                    transform: Transform::from_xyz(TUNNEL_HALF_WIDTH + 2.0, 2.5, z),
                    ..default()
                },
                Name::new(format!("LampPost{lamps}")),
            ))
            .with_children(|p| {
                p.spawn((
                    PointLightBundle {
                        point_light: PointLight { color, intensity: 400_000.0, range: 25.0, ..default() },
                        transform: Transform::from_xyz(-0.5, 2.6, 0.0),
                        ..default()
                    },
                    SceneLight { color, ..default() },
                    Name::new("Bulb"),
                ));
            });
        lamps += 1;
        z += LAMP_SPACING;
    }

    // A portable gadget parked next to the road; never touched by the bubble.
    commands.spawn((
        PointLightBundle {
            point_light: PointLight { color: Color::WHITE, intensity: 80_000.0, range: 8.0, ..default() },
            transform: Transform::from_xyz(-3.0, 0.5, -60.0),
            ..default()
        },
        SceneLight::default(),
        PortableLight,
        Name::new("Lantern"),
    ));

    info!("DEMO spawned lamps={lamps} tunnel={}", layout.with_tunnel);
    ev_ready.send(SceneReady);
}

fn drive_camera(time: Res<Time>, mut drive: ResMut<DemoDrive>, mut q_cam: Query<&mut Transform, With<ObserverCamera>>) {
    let Ok(mut cam_t) = q_cam.get_single_mut() else { return; };
    drive.z += drive.heading * drive.speed * time.delta_seconds();
    if drive.z.abs() > ROAD_HALF_LENGTH - 10.0 {
        drive.z = drive.z.clamp(-(ROAD_HALF_LENGTH - 10.0), ROAD_HALF_LENGTH - 10.0);
        drive.heading = -drive.heading;
    }
    cam_t.translation = Vec3::new(0.0, EYE_HEIGHT, drive.z);
    cam_t.look_at(Vec3::new(0.0, EYE_HEIGHT, drive.z + drive.heading * 10.0), Vec3::Y);
}

fn refresh_hotkey(keys: Res<ButtonInput<KeyCode>>, mut ev_refresh: EventWriter<RefreshLighting>) {
    if keys.just_pressed(KeyCode::F5) {
        info!("DEMO refresh requested");
        ev_refresh.send(RefreshLighting);
    }
}
