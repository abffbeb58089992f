pub(crate) const VERTEX_SHADER: &str = r#"#version 300 es

in vec3 oc_position;
in vec3 oc_normal;
in vec2 texcoord;

uniform mat4 mvp_matrix;
uniform mat4 m_matrix;
uniform mat3 normal_matrix;

out vec3 wc_frag_normal;
out vec2 frag_texcoord;
out vec3 wc_frag_pos;

void main() {
  gl_Position = mvp_matrix * vec4(oc_position, 1.0);
  wc_frag_pos = (m_matrix * vec4(oc_position, 1.0)).xyz;
  wc_frag_normal = normalize(normal_matrix * oc_normal);
  frag_texcoord = texcoord;
}
"#;

pub(crate) const FRAGMENT_SHADER: &str = r#"#version 300 es

precision highp float;

in vec3 wc_frag_normal;
in vec2 frag_texcoord;
in vec3 wc_frag_pos;

out vec4 color;

uniform sampler2D tex;
uniform vec3 wc_camera_position;

uniform float ns;
uniform vec3 ka;
uniform vec3 kd;
uniform vec3 ks;
uniform vec3 ke;
uniform float ni;
uniform float d;
uniform float illum;

uniform int light_count;
uniform int[4] light_types;
uniform vec3[4] light_colors;
uniform vec3[4] wc_light_positions;

uniform float fog_density;
uniform vec3 fog_color;

vec3 tonemap(vec3 linear) {
  float brightness = 1.2;
  float gamma = 2.2;

  return pow(linear * brightness, vec3(1.0 / gamma));
}

void main() {
  vec3 ambient_color = vec3(0.01, 0.01, 0.01);
  vec3 tex_color = texture(tex, frag_texcoord).rgb;
  vec3 n = normalize(wc_frag_normal);

  vec3 linear = ka * ambient_color + ke;

  vec3 to_camera = wc_camera_position - wc_frag_pos;
  vec3 v = normalize(to_camera);

  for (int i = 0; i < light_count; i++) {
    vec3 light_color = light_colors[i];
    vec3 l = light_types[i] == 1
      ? normalize(-wc_light_positions[i])
      : normalize(wc_light_positions[i] - wc_frag_pos);

    vec3 diffuse = kd * light_color * tex_color * max(dot(n, l), 0.0);
    vec3 specular = ks * light_color * pow(max(dot(reflect(-l, n), v), 0.0), ns);

    linear += diffuse + specular;
  }

  float fog = exp(-pow(fog_density * length(to_camera), 2.0));
  color = vec4(mix(fog_color, tonemap(linear), clamp(fog, 0.0, 1.0)), d);
}
"#;

pub(crate) const CUBE_POSITIONS: &[f32] = &[
    -1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0, 1.0, -1.0, // top
    -1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, -1.0, //
    -1.0, -1.0, 1.0, -1.0, -1.0, -1.0, 1.0, -1.0, 1.0, // bottom
    -1.0, -1.0, -1.0, 1.0, -1.0, -1.0, 1.0, -1.0, 1.0, //
    -1.0, 1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0, 1.0, // front
    -1.0, -1.0, 1.0, 1.0, -1.0, 1.0, 1.0, 1.0, 1.0, //
    -1.0, -1.0, -1.0, -1.0, 1.0, -1.0, 1.0, -1.0, -1.0, // back
    -1.0, 1.0, -1.0, 1.0, 1.0, -1.0, 1.0, -1.0, -1.0, //
    -1.0, -1.0, -1.0, -1.0, -1.0, 1.0, -1.0, 1.0, -1.0, // left
    -1.0, -1.0, 1.0, -1.0, 1.0, 1.0, -1.0, 1.0, -1.0, //
    1.0, 1.0, -1.0, 1.0, 1.0, 1.0, 1.0, -1.0, -1.0, // right
    1.0, 1.0, 1.0, 1.0, -1.0, 1.0, 1.0, -1.0, -1.0, //
];

pub(crate) const CUBE_FACE_NORMALS: [[f32; 3]; 6] = [
    [0.0, 1.0, 0.0],
    [0.0, -1.0, 0.0],
    [0.0, 0.0, 1.0],
    [0.0, 0.0, -1.0],
    [-1.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
];

const THIRD: f32 = 1.0 / 3.0;
const TWO_THIRDS: f32 = 2.0 / 3.0;

pub(crate) const CUBE_TEXCOORDS: &[f32] = &[
    0.25, 0.0, 0.25, THIRD, 0.5, 0.0, // top
    0.25, THIRD, 0.5, THIRD, 0.5, 0.0, //
    0.25, TWO_THIRDS, 0.25, 1.0, 0.5, TWO_THIRDS, // bottom
    0.25, 1.0, 0.5, 1.0, 0.5, TWO_THIRDS, //
    0.25, THIRD, 0.25, TWO_THIRDS, 0.5, THIRD, // front
    0.25, TWO_THIRDS, 0.5, TWO_THIRDS, 0.5, THIRD, //
    1.0, TWO_THIRDS, 1.0, THIRD, 0.75, TWO_THIRDS, // back
    1.0, THIRD, 0.75, THIRD, 0.75, TWO_THIRDS, //
    0.0, TWO_THIRDS, 0.25, TWO_THIRDS, 0.0, THIRD, // left
    0.25, TWO_THIRDS, 0.25, THIRD, 0.0, THIRD, //
    0.75, THIRD, 0.5, THIRD, 0.75, TWO_THIRDS, // right
    0.5, THIRD, 0.5, TWO_THIRDS, 0.75, TWO_THIRDS, //
];
